//! StoreHandle - async request/response front for the store actor

use crate::actor::{Listening, Reply, SessionId, StoreActor, StoreCmd};
use crate::config::{AccessRules, StoreConfig};
use arbor_model::{
    Clock, DisconnectOp, ListItem, Map, Query, SystemClock, TreeError, TreeResult, Value,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// A live client session.
///
/// The store holds the other end of a liveness channel; dropping the
/// session (or the process holding it) is how the store learns the client
/// is gone and runs the session's on-disconnect hooks.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    server_time_ms: u64,
    _alive: oneshot::Sender<()>,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Server clock reading taken when the session was opened.
    pub fn server_time_ms(&self) -> u64 {
        self.server_time_ms
    }
}

/// Cloneable handle to a running store.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCmd>,
}

impl StoreHandle {
    /// Start a store on the current tokio runtime using the system clock.
    pub fn spawn(config: StoreConfig) -> TreeResult<Self> {
        Self::spawn_with_clock(config, Arc::new(SystemClock))
    }

    /// Start a store with an explicit server clock (for testing).
    pub fn spawn_with_clock(config: StoreConfig, clock: Arc<dyn Clock>) -> TreeResult<Self> {
        let rules = AccessRules::from_config(&config)?;
        let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
        let actor = StoreActor::new(rules, clock, rx, tx.downgrade());
        tokio::spawn(actor.run());
        Ok(Self { tx })
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> StoreCmd) -> TreeResult<T> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(make(resp_tx))
            .await
            .map_err(|_| TreeError::Unavailable("store has shut down".to_string()))?;
        resp_rx.await.map_err(|_| TreeError::Closed)?
    }

    pub async fn get(&self, path: &str) -> TreeResult<Value> {
        let path = path.to_string();
        self.request(|resp| StoreCmd::Get { path, resp }).await
    }

    pub async fn query(&self, path: &str, query: Query) -> TreeResult<Vec<ListItem>> {
        let path = path.to_string();
        self.request(|resp| StoreCmd::Query { path, query, resp }).await
    }

    pub async fn set(&self, path: &str, value: Value) -> TreeResult<()> {
        let path = path.to_string();
        self.request(|resp| StoreCmd::Set { path, value, resp }).await
    }

    pub async fn update(&self, path: &str, children: Map<String, Value>) -> TreeResult<()> {
        let path = path.to_string();
        self.request(|resp| StoreCmd::Update { path, children, resp }).await
    }

    pub async fn remove(&self, path: &str) -> TreeResult<()> {
        let path = path.to_string();
        self.request(|resp| StoreCmd::Remove { path, resp }).await
    }

    /// Append under `path` with a store-generated key. Returns the key.
    pub async fn push(&self, path: &str, value: Value) -> TreeResult<String> {
        let path = path.to_string();
        self.request(|resp| StoreCmd::Push { path, value, resp }).await
    }

    /// Listen to the node at `path`.
    pub async fn listen(&self, path: &str) -> TreeResult<Listening<Value>> {
        let path = path.to_string();
        self.request(|resp| StoreCmd::Listen { path, resp }).await
    }

    /// Listen to the children of `path` as filtered by `query`.
    pub async fn listen_query(
        &self,
        path: &str,
        query: Query,
    ) -> TreeResult<Listening<Vec<ListItem>>> {
        let path = path.to_string();
        self.request(|resp| StoreCmd::ListenQuery { path, query, resp }).await
    }

    /// Remove a listener. Dropping its receiver has the same effect lazily.
    pub async fn unlisten(&self, id: crate::ListenerId) {
        let _ = self.tx.send(StoreCmd::Unlisten { id }).await;
    }

    /// Open a session.
    pub async fn connect(&self) -> TreeResult<Session> {
        let (alive_tx, alive) = oneshot::channel();
        let (id, server_time_ms) = self.request(|resp| StoreCmd::Connect { alive, resp }).await?;
        Ok(Session { id, server_time_ms, _alive: alive_tx })
    }

    /// Close a session and wait until its hooks have run.
    pub async fn disconnect(&self, session: Session) -> TreeResult<()> {
        let id = session.id;
        let result = self.request(|resp| StoreCmd::Disconnect { session: id, resp }).await;
        drop(session);
        result
    }

    /// Register a write the store performs when `session` drops.
    pub async fn on_disconnect(
        &self,
        session: SessionId,
        path: &str,
        op: DisconnectOp,
    ) -> TreeResult<()> {
        let path = path.to_string();
        self.request(|resp| StoreCmd::OnDisconnect { session, path, op, resp }).await
    }

    /// Drop hooks registered at or below `path` for `session`.
    pub async fn cancel_on_disconnect(&self, session: SessionId, path: &str) -> TreeResult<()> {
        let path = path.to_string();
        self.request(|resp| StoreCmd::CancelOnDisconnect { session, path, resp }).await
    }

    /// Whole tree as one JSON value.
    pub async fn export(&self) -> TreeResult<Value> {
        self.request(|resp| StoreCmd::Export { resp }).await
    }

    /// Replace the whole tree; every listener is re-evaluated.
    pub async fn import(&self, value: Value) -> TreeResult<()> {
        self.request(|resp| StoreCmd::Import { value, resp }).await
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(StoreCmd::Shutdown).await;
    }
}
