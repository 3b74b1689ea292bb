//! StoreActor - the authoritative tree behind a command channel
//!
//! Every request is a `StoreCmd` carrying a oneshot reply. The actor
//! applies commands one at a time, so concurrent clients are serialised
//! here and nowhere else. After each applied mutation the listeners
//! whose path overlaps a changed path re-evaluate their view and receive
//! it if it changed.

use crate::config::AccessRules;
use crate::tree::Tree;
use arbor_model::value::resolve_server_values;
use arbor_model::{
    children_of, Clock, DisconnectOp, ListItem, Map, Path, PushIdGenerator, Query, TreeError,
    TreeResult, Value,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type ListenerId = u64;
pub type SessionId = Uuid;

pub(crate) type Reply<T> = oneshot::Sender<TreeResult<T>>;

/// Registration result: the current view plus a channel of later views.
#[derive(Debug)]
pub struct Listening<T> {
    pub id: ListenerId,
    pub initial: T,
    pub updates: mpsc::UnboundedReceiver<T>,
}

/// Store commands
pub(crate) enum StoreCmd {
    Get { path: String, resp: Reply<Value> },
    Query { path: String, query: Query, resp: Reply<Vec<ListItem>> },
    Set { path: String, value: Value, resp: Reply<()> },
    Update { path: String, children: Map<String, Value>, resp: Reply<()> },
    Remove { path: String, resp: Reply<()> },
    Push { path: String, value: Value, resp: Reply<String> },
    Listen { path: String, resp: Reply<Listening<Value>> },
    ListenQuery { path: String, query: Query, resp: Reply<Listening<Vec<ListItem>>> },
    Unlisten { id: ListenerId },
    Connect { alive: oneshot::Receiver<()>, resp: Reply<(SessionId, u64)> },
    Disconnect { session: SessionId, resp: Reply<()> },
    SessionDropped { session: SessionId },
    OnDisconnect { session: SessionId, path: String, op: DisconnectOp, resp: Reply<()> },
    CancelOnDisconnect { session: SessionId, path: String, resp: Reply<()> },
    Export { resp: Reply<Value> },
    Import { value: Value, resp: Reply<()> },
    Shutdown,
}

enum Sink {
    Node {
        tx: mpsc::UnboundedSender<Value>,
        last: Value,
    },
    Query {
        query: Query,
        tx: mpsc::UnboundedSender<Vec<ListItem>>,
        last: Vec<ListItem>,
    },
}

/// A registered listener with its last delivered view
struct Listener {
    path: Path,
    sink: Sink,
}

impl Listener {
    /// Push the current view if it differs from the last one.
    /// Returns false once the receiving side is gone.
    fn refresh(&mut self, tree: &Tree) -> bool {
        let path = &self.path;
        match &mut self.sink {
            Sink::Node { tx, last } => {
                let view = tree.get(path);
                if view == *last {
                    return !tx.is_closed();
                }
                *last = view.clone();
                tx.send(view).is_ok()
            }
            Sink::Query { query, tx, last } => {
                let view = query.apply(children_of(&tree.get(path)));
                if view == *last {
                    return !tx.is_closed();
                }
                *last = view.clone();
                tx.send(view).is_ok()
            }
        }
    }
}

#[derive(Default)]
struct SessionState {
    hooks: Vec<(Path, DisconnectOp)>,
}

pub(crate) struct StoreActor {
    tree: Tree,
    rules: AccessRules,
    clock: Arc<dyn Clock>,
    push_ids: PushIdGenerator,
    rx: mpsc::Receiver<StoreCmd>,
    weak_tx: mpsc::WeakSender<StoreCmd>,
    listeners: HashMap<ListenerId, Listener>,
    next_listener_id: ListenerId,
    sessions: HashMap<SessionId, SessionState>,
}

/// Parse a client path, refusing the client-side `.info` namespace.
fn data_path(raw: &str) -> TreeResult<Path> {
    let path = Path::parse(raw)?;
    if path.is_info() {
        return Err(TreeError::InvalidPath(format!(
            "'{}' is a client-side virtual path",
            raw
        )));
    }
    Ok(path)
}

impl StoreActor {
    pub(crate) fn new(
        rules: AccessRules,
        clock: Arc<dyn Clock>,
        rx: mpsc::Receiver<StoreCmd>,
        weak_tx: mpsc::WeakSender<StoreCmd>,
    ) -> Self {
        Self {
            tree: Tree::new(),
            rules,
            push_ids: PushIdGenerator::new(clock.clone()),
            clock,
            rx,
            weak_tx,
            listeners: HashMap::new(),
            next_listener_id: 0,
            sessions: HashMap::new(),
        }
    }

    /// Run the actor loop until shutdown or until every handle is dropped.
    pub(crate) async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                StoreCmd::Get { path, resp } => {
                    let result = data_path(&path).map(|p| self.tree.get(&p));
                    let _ = resp.send(result);
                }
                StoreCmd::Query { path, query, resp } => {
                    let result = self.query(&path, &query);
                    let _ = resp.send(result);
                }
                StoreCmd::Set { path, value, resp } => {
                    let result = data_path(&path).and_then(|p| self.apply(vec![(p, value)]));
                    let _ = resp.send(result);
                }
                StoreCmd::Update { path, children, resp } => {
                    let result = data_path(&path)
                        .and_then(|p| Tree::plan_update(&p, children))
                        .and_then(|writes| self.apply(writes));
                    let _ = resp.send(result);
                }
                StoreCmd::Remove { path, resp } => {
                    let result = data_path(&path).and_then(|p| self.apply(vec![(p, Value::Null)]));
                    let _ = resp.send(result);
                }
                StoreCmd::Push { path, value, resp } => {
                    let result = self.push(&path, value);
                    let _ = resp.send(result);
                }
                StoreCmd::Listen { path, resp } => {
                    let result = self.listen(&path);
                    let _ = resp.send(result);
                }
                StoreCmd::ListenQuery { path, query, resp } => {
                    let result = self.listen_query(&path, query);
                    let _ = resp.send(result);
                }
                StoreCmd::Unlisten { id } => {
                    if self.listeners.remove(&id).is_some() {
                        debug!(listener = id, "Listener removed");
                    }
                }
                StoreCmd::Connect { alive, resp } => {
                    let result = Ok(self.connect(alive));
                    let _ = resp.send(result);
                }
                StoreCmd::Disconnect { session, resp } => {
                    self.drop_session(session, "closed by client");
                    let _ = resp.send(Ok(()));
                }
                StoreCmd::SessionDropped { session } => {
                    self.drop_session(session, "channel lost");
                }
                StoreCmd::OnDisconnect { session, path, op, resp } => {
                    let result = self.register_hook(session, &path, op);
                    let _ = resp.send(result);
                }
                StoreCmd::CancelOnDisconnect { session, path, resp } => {
                    let result = self.cancel_hooks(session, &path);
                    let _ = resp.send(result);
                }
                StoreCmd::Export { resp } => {
                    let _ = resp.send(Ok(self.tree.export()));
                }
                StoreCmd::Import { value, resp } => {
                    self.tree.import(value);
                    self.refresh_all();
                    let _ = resp.send(Ok(()));
                }
                StoreCmd::Shutdown => break,
            }
        }
        debug!("Store actor stopped");
    }

    fn query(&self, path: &str, query: &Query) -> TreeResult<Vec<ListItem>> {
        let path = data_path(path)?;
        query.validate()?;
        Ok(query.apply(children_of(&self.tree.get(&path))))
    }

    /// Check, stamp and apply a group of writes, then notify listeners.
    /// Nothing is applied unless every write passes the rules.
    fn apply(&mut self, mut writes: Vec<(Path, Value)>) -> TreeResult<()> {
        for (path, value) in &writes {
            self.rules.check_write(path)?;
            self.rules.check_size(value)?;
        }

        let now = self.clock.now_ms();
        for (path, value) in writes.iter_mut() {
            resolve_server_values(value, now);
            debug!(path = %path, "Applying write");
            self.tree.set(path, value.take());
        }

        let changed: Vec<Path> = writes.into_iter().map(|(p, _)| p).collect();
        self.notify(&changed);
        Ok(())
    }

    fn push(&mut self, path: &str, value: Value) -> TreeResult<String> {
        let parent = data_path(path)?;
        let key = self.push_ids.next_id();
        let target = parent.join(&key)?;
        self.apply(vec![(target, value)])?;
        Ok(key)
    }

    fn notify(&mut self, changed: &[Path]) {
        let tree = &self.tree;
        self.listeners.retain(|id, listener| {
            if !changed.iter().any(|c| c.overlaps(&listener.path)) {
                return true;
            }
            let alive = listener.refresh(tree);
            if !alive {
                debug!(listener = *id, "Pruning closed listener");
            }
            alive
        });
    }

    fn refresh_all(&mut self) {
        let tree = &self.tree;
        self.listeners.retain(|_, listener| listener.refresh(tree));
    }

    fn next_id(&mut self) -> ListenerId {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        id
    }

    fn listen(&mut self, path: &str) -> TreeResult<Listening<Value>> {
        let path = data_path(path)?;
        let initial = self.tree.get(&path);
        let (tx, updates) = mpsc::unbounded_channel();
        let id = self.next_id();
        debug!(listener = id, path = %path, "Listener added");
        self.listeners.insert(
            id,
            Listener { path, sink: Sink::Node { tx, last: initial.clone() } },
        );
        Ok(Listening { id, initial, updates })
    }

    fn listen_query(&mut self, path: &str, query: Query) -> TreeResult<Listening<Vec<ListItem>>> {
        let path = data_path(path)?;
        query.validate()?;
        let initial = query.apply(children_of(&self.tree.get(&path)));
        let (tx, updates) = mpsc::unbounded_channel();
        let id = self.next_id();
        debug!(listener = id, path = %path, "Query listener added");
        self.listeners.insert(
            id,
            Listener { path, sink: Sink::Query { query, tx, last: initial.clone() } },
        );
        Ok(Listening { id, initial, updates })
    }

    fn connect(&mut self, alive: oneshot::Receiver<()>) -> (SessionId, u64) {
        let id = Uuid::new_v4();
        self.sessions.insert(id, SessionState::default());

        // The store notices a lost client by the liveness channel closing,
        // without any cooperation from the client.
        let weak = self.weak_tx.clone();
        tokio::spawn(async move {
            let _ = alive.await;
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(StoreCmd::SessionDropped { session: id }).await;
            }
        });

        info!(session = %id, "Session connected");
        (id, self.clock.now_ms())
    }

    fn register_hook(
        &mut self,
        session: SessionId,
        path: &str,
        op: DisconnectOp,
    ) -> TreeResult<()> {
        let path = data_path(path)?;
        // Same checks the deferred write will face when it runs
        let planned = match &op {
            DisconnectOp::Set(value) => vec![(path.clone(), value.clone())],
            DisconnectOp::Update(children) => Tree::plan_update(&path, children.clone())?,
            DisconnectOp::Remove => vec![(path.clone(), Value::Null)],
        };
        for (target, value) in &planned {
            self.rules.check_write(target)?;
            self.rules.check_size(value)?;
        }

        let state = self
            .sessions
            .get_mut(&session)
            .ok_or_else(|| TreeError::Unavailable("session is not connected".to_string()))?;
        debug!(session = %session, path = %path, "On-disconnect hook registered");
        state.hooks.push((path, op));
        Ok(())
    }

    fn cancel_hooks(&mut self, session: SessionId, path: &str) -> TreeResult<()> {
        let path = data_path(path)?;
        let state = self
            .sessions
            .get_mut(&session)
            .ok_or_else(|| TreeError::Unavailable("session is not connected".to_string()))?;
        state.hooks.retain(|(p, _)| !path.contains(p));
        Ok(())
    }

    /// Forget a session and run its hooks in registration order.
    fn drop_session(&mut self, session: SessionId, reason: &str) {
        let Some(state) = self.sessions.remove(&session) else {
            return;
        };
        info!(session = %session, hooks = state.hooks.len(), "Session dropped: {}", reason);

        for (path, op) in state.hooks {
            let result = match op {
                DisconnectOp::Set(value) => self.apply(vec![(path.clone(), value)]),
                DisconnectOp::Update(children) => {
                    Tree::plan_update(&path, children).and_then(|writes| self.apply(writes))
                }
                DisconnectOp::Remove => self.apply(vec![(path.clone(), Value::Null)]),
            };
            if let Err(e) = result {
                warn!(error = %e, path = %path, "On-disconnect hook failed");
            }
        }
    }
}
