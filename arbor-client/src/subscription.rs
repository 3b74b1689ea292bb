use arbor_model::TreeResult;
use futures_util::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A live subscription. Yields the current value first, then one item per
/// remote change. Dropping it (or calling `cancel`) releases the listener.
pub struct Subscription<T> {
    inner: Pin<Box<dyn Stream<Item = TreeResult<T>> + Send>>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(stream: impl Stream<Item = TreeResult<T>> + Send + 'static) -> Self {
        Self { inner: Box::pin(stream) }
    }

    pub fn cancel(self) {}
}

impl<T> Stream for Subscription<T> {
    type Item = TreeResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
