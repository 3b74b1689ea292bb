//! TreeTransport - the seam between the adapter and a tree store
//!
//! Object-safe so the adapter can hold `Arc<dyn TreeTransport>`; async
//! methods return boxed futures.

use arbor_model::{DisconnectOp, ListItem, Map, Query, TreeResult, Value};
use futures_util::Stream;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::watch;

/// Async result type for transport methods
pub type AsyncResult<'a, T> = Pin<Box<dyn Future<Output = TreeResult<T>> + Send + 'a>>;

/// Live snapshots from one listener, initial value first.
pub type SnapshotStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Connection to a tree store.
///
/// Paths are passed through unvalidated; implementations report malformed
/// ones as `TreeError` values.
pub trait TreeTransport: Send + Sync {
    // ---- one-time operations ----
    fn get<'a>(&'a self, path: &'a str) -> AsyncResult<'a, Value>;
    fn query<'a>(&'a self, path: &'a str, query: Query) -> AsyncResult<'a, Vec<ListItem>>;
    fn set<'a>(&'a self, path: &'a str, value: Value) -> AsyncResult<'a, ()>;
    fn update<'a>(&'a self, path: &'a str, children: Map<String, Value>) -> AsyncResult<'a, ()>;
    fn remove<'a>(&'a self, path: &'a str) -> AsyncResult<'a, ()>;
    /// Append with a store-generated key, returning the key.
    fn push<'a>(&'a self, path: &'a str, value: Value) -> AsyncResult<'a, String>;

    // ---- subscriptions ----
    fn listen<'a>(&'a self, path: &'a str) -> AsyncResult<'a, SnapshotStream<Value>>;
    fn listen_query<'a>(
        &'a self,
        path: &'a str,
        query: Query,
    ) -> AsyncResult<'a, SnapshotStream<Vec<ListItem>>>;

    // ---- on-disconnect hooks (bound to the current session) ----
    fn on_disconnect<'a>(&'a self, path: &'a str, op: DisconnectOp) -> AsyncResult<'a, ()>;
    fn cancel_on_disconnect<'a>(&'a self, path: &'a str) -> AsyncResult<'a, ()>;
    /// Register `hook` at `hook_path`, then write `value` at `path`, both
    /// within one session: the write is undone by that session's hook.
    fn set_with_on_disconnect<'a>(
        &'a self,
        path: &'a str,
        value: Value,
        hook_path: &'a str,
        hook: DisconnectOp,
    ) -> AsyncResult<'a, ()>;

    // ---- connection ----
    fn connected(&self) -> watch::Receiver<bool>;
    /// `server_clock - client_clock` in milliseconds, as of the last connect.
    fn server_time_offset(&self) -> watch::Receiver<i64>;
    /// Client-side push key, no round trip.
    fn next_push_id(&self) -> String;
    fn go_online(&self) -> AsyncResult<'_, ()>;
    fn go_offline(&self) -> AsyncResult<'_, ()>;
    /// Disconnect and end every live subscription.
    fn close(&self) -> AsyncResult<'_, ()>;
}
