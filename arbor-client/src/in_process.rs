//! InProcessTransport - TreeTransport over an `arbor-store` handle
//!
//! Owns the client side of one store session. The `.info` virtual paths are
//! answered locally from watch channels; everything else goes to the store.

use crate::transport::{AsyncResult, SnapshotStream, TreeTransport};
use arbor_model::{
    Clock, DisconnectOp, ListItem, Map, PushIdGenerator, Query, TreeError, TreeResult, Value,
    CONNECTED_PATH, SERVER_TIME_OFFSET_PATH,
};
use arbor_store::{Listening, Session, SessionId, StoreHandle};
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, RwLock, RwLockReadGuard};
use tokio_stream::wrappers::{UnboundedReceiverStream, WatchStream};
use tracing::{debug, info};

enum InfoPath {
    Connected,
    ServerTimeOffset,
}

fn info_path(path: &str) -> Option<InfoPath> {
    match path.trim_matches('/') {
        p if p == CONNECTED_PATH => Some(InfoPath::Connected),
        p if p == SERVER_TIME_OFFSET_PATH => Some(InfoPath::ServerTimeOffset),
        _ => None,
    }
}

fn offline() -> TreeError {
    TreeError::Unavailable("client is offline".to_string())
}

fn session_id(slot: &Option<Session>) -> TreeResult<SessionId> {
    slot.as_ref().map(Session::id).ok_or_else(offline)
}

pub struct InProcessTransport {
    store: StoreHandle,
    clock: Arc<dyn Clock>,
    push_ids: PushIdGenerator,
    session: RwLock<Option<Session>>,
    connected_tx: watch::Sender<bool>,
    offset_tx: watch::Sender<i64>,
    shutdown_tx: broadcast::Sender<()>,
}

impl InProcessTransport {
    /// Create an offline transport. `clock` is the client's clock, used for
    /// push keys and the server offset estimate.
    pub fn new(store: StoreHandle, clock: Arc<dyn Clock>) -> Self {
        let (connected_tx, _) = watch::channel(false);
        let (offset_tx, _) = watch::channel(0);
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            store,
            push_ids: PushIdGenerator::new(clock.clone()),
            clock,
            session: RwLock::new(None),
            connected_tx,
            offset_tx,
            shutdown_tx,
        }
    }

    pub fn is_online(&self) -> bool {
        *self.connected_tx.borrow()
    }

    /// Shared hold on the open session.
    ///
    /// Requests made while the guard is held complete before the session
    /// can be closed, so a write never lands after its session's
    /// on-disconnect hooks have run.
    async fn online(&self) -> TreeResult<RwLockReadGuard<'_, Option<Session>>> {
        let slot = self.session.read().await;
        if slot.is_none() {
            return Err(offline());
        }
        Ok(slot)
    }

    async fn connect(&self) -> TreeResult<()> {
        let mut slot = self.session.write().await;
        if slot.is_some() {
            return Ok(());
        }
        let session = self.store.connect().await?;
        let offset = session.server_time_ms() as i64 - self.clock.now_ms() as i64;
        info!(session = %session.id(), offset_ms = offset, "Connected to tree store");
        *slot = Some(session);
        self.offset_tx.send_replace(offset);
        self.connected_tx.send_replace(true);
        Ok(())
    }

    async fn disconnect(&self) -> TreeResult<()> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };
        self.connected_tx.send_replace(false);
        let id = session.id();
        // The store may already be gone; the session is closed either way.
        let result = self.store.disconnect(session).await;
        info!(session = %id, "Disconnected from tree store");
        match result {
            Err(TreeError::Unavailable(_)) | Err(TreeError::Closed) => Ok(()),
            other => other,
        }
    }

    /// Bridge a store listener to a stream that pauses while offline.
    ///
    /// Updates arriving while disconnected are held back; on reconnection
    /// only the newest one is delivered, and only when it differs from
    /// what the subscriber last saw.
    fn forward<T>(&self, listening: Listening<T>) -> SnapshotStream<T>
    where
        T: Clone + PartialEq + Send + 'static,
    {
        let Listening { id, initial, mut updates } = listening;
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let _ = out_tx.send(initial.clone());

        let store = self.store.clone();
        let mut connected = self.connected_tx.subscribe();
        let mut shutdown = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut last = initial;
            let mut pending: Option<T> = None;
            loop {
                let delivered = tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = out_tx.closed() => break,
                    next = updates.recv() => match next {
                        Some(view) if *connected.borrow() => {
                            // Anything held from the offline period is older
                            pending = None;
                            Some(view)
                        }
                        Some(view) => {
                            pending = Some(view);
                            None
                        }
                        None => break,
                    },
                    changed = connected.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if *connected.borrow_and_update() {
                            pending.take()
                        } else {
                            None
                        }
                    }
                };
                if let Some(view) = delivered {
                    if view != last {
                        last = view.clone();
                        if out_tx.send(view).is_err() {
                            break;
                        }
                    }
                }
            }
            debug!(listener = id, "Subscription ended");
            store.unlisten(id).await;
        });

        Box::pin(UnboundedReceiverStream::new(out_rx))
    }
}

impl TreeTransport for InProcessTransport {
    fn get<'a>(&'a self, path: &'a str) -> AsyncResult<'a, Value> {
        Box::pin(async move {
            match info_path(path) {
                Some(InfoPath::Connected) => Ok(Value::Bool(self.is_online())),
                Some(InfoPath::ServerTimeOffset) => {
                    let offset = *self.offset_tx.borrow();
                    Ok(Value::from(offset))
                }
                None => {
                    let _session = self.online().await?;
                    self.store.get(path).await
                }
            }
        })
    }

    fn query<'a>(&'a self, path: &'a str, query: Query) -> AsyncResult<'a, Vec<ListItem>> {
        Box::pin(async move {
            let _session = self.online().await?;
            self.store.query(path, query).await
        })
    }

    fn set<'a>(&'a self, path: &'a str, value: Value) -> AsyncResult<'a, ()> {
        Box::pin(async move {
            let _session = self.online().await?;
            self.store.set(path, value).await
        })
    }

    fn update<'a>(&'a self, path: &'a str, children: Map<String, Value>) -> AsyncResult<'a, ()> {
        Box::pin(async move {
            let _session = self.online().await?;
            self.store.update(path, children).await
        })
    }

    fn remove<'a>(&'a self, path: &'a str) -> AsyncResult<'a, ()> {
        Box::pin(async move {
            let _session = self.online().await?;
            self.store.remove(path).await
        })
    }

    fn push<'a>(&'a self, path: &'a str, value: Value) -> AsyncResult<'a, String> {
        Box::pin(async move {
            let _session = self.online().await?;
            self.store.push(path, value).await
        })
    }

    fn listen<'a>(&'a self, path: &'a str) -> AsyncResult<'a, SnapshotStream<Value>> {
        Box::pin(async move {
            match info_path(path) {
                Some(InfoPath::Connected) => {
                    let stream = WatchStream::new(self.connected_tx.subscribe()).map(Value::Bool);
                    Ok(Box::pin(stream) as SnapshotStream<Value>)
                }
                Some(InfoPath::ServerTimeOffset) => {
                    let stream = WatchStream::new(self.offset_tx.subscribe()).map(Value::from);
                    Ok(Box::pin(stream) as SnapshotStream<Value>)
                }
                None => {
                    let _session = self.online().await?;
                    let listening = self.store.listen(path).await?;
                    Ok(self.forward(listening))
                }
            }
        })
    }

    fn listen_query<'a>(
        &'a self,
        path: &'a str,
        query: Query,
    ) -> AsyncResult<'a, SnapshotStream<Vec<ListItem>>> {
        Box::pin(async move {
            let _session = self.online().await?;
            let listening = self.store.listen_query(path, query).await?;
            Ok(self.forward(listening))
        })
    }

    fn on_disconnect<'a>(&'a self, path: &'a str, op: DisconnectOp) -> AsyncResult<'a, ()> {
        Box::pin(async move {
            let slot = self.online().await?;
            self.store.on_disconnect(session_id(&slot)?, path, op).await
        })
    }

    fn cancel_on_disconnect<'a>(&'a self, path: &'a str) -> AsyncResult<'a, ()> {
        Box::pin(async move {
            let slot = self.online().await?;
            self.store.cancel_on_disconnect(session_id(&slot)?, path).await
        })
    }

    fn set_with_on_disconnect<'a>(
        &'a self,
        path: &'a str,
        value: Value,
        hook_path: &'a str,
        hook: DisconnectOp,
    ) -> AsyncResult<'a, ()> {
        Box::pin(async move {
            let slot = self.online().await?;
            self.store.on_disconnect(session_id(&slot)?, hook_path, hook).await?;
            self.store.set(path, value).await
        })
    }

    fn connected(&self) -> watch::Receiver<bool> {
        self.connected_tx.subscribe()
    }

    fn server_time_offset(&self) -> watch::Receiver<i64> {
        self.offset_tx.subscribe()
    }

    fn next_push_id(&self) -> String {
        self.push_ids.next_id()
    }

    fn go_online(&self) -> AsyncResult<'_, ()> {
        Box::pin(self.connect())
    }

    fn go_offline(&self) -> AsyncResult<'_, ()> {
        Box::pin(self.disconnect())
    }

    fn close(&self) -> AsyncResult<'_, ()> {
        Box::pin(async move {
            let result = self.disconnect().await;
            let _ = self.shutdown_tx.send(());
            result
        })
    }
}
