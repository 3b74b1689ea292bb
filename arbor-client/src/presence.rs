//! PresenceMonitor - keeps `{root}/{userId}` in step with the connection
//!
//! On every transition to connected, the monitor first asks the store to
//! mark the user offline (with a server timestamp) once this session drops,
//! then marks the user online, both within the same session. The hook is
//! bound to the session, so it is re-registered after each reconnect.

use crate::transport::TreeTransport;
use arbor_model::{server_timestamp, DisconnectOp, Map, TreeResult, Value};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const ONLINE_FIELD: &str = "online";
pub const LAST_SEEN_FIELD: &str = "lastSeen";

/// Handle to a running presence task. Dropping it stops the task.
#[derive(Debug)]
pub struct PresenceMonitor {
    user_path: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PresenceMonitor {
    pub(crate) fn start(transport: Arc<dyn TreeTransport>, user_path: String) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let mut connected = transport.connected();
        let path = user_path.clone();

        let task = tokio::spawn(async move {
            loop {
                let online = *connected.borrow_and_update();
                if online {
                    match announce(transport.as_ref(), &path).await {
                        Ok(()) => debug!(path = %path, "Presence announced"),
                        Err(e) => warn!(path = %path, error = %e, "Presence update failed"),
                    }
                }
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    changed = connected.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self { user_path, shutdown_tx: Some(shutdown_tx), task: Some(task) }
    }

    /// Node the monitor maintains.
    pub fn path(&self) -> &str {
        &self.user_path
    }

    /// Stop the task and wait for it to finish. Already-registered
    /// on-disconnect hooks stay in place.
    pub async fn stop(mut self) {
        self.shutdown_tx.take();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PresenceMonitor {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn announce(transport: &dyn TreeTransport, user_path: &str) -> TreeResult<()> {
    let mut offline = Map::new();
    offline.insert(ONLINE_FIELD.to_string(), Value::Bool(false));
    offline.insert(LAST_SEEN_FIELD.to_string(), server_timestamp());
    let online_path = format!("{}/{}", user_path, ONLINE_FIELD);
    transport
        .set_with_on_disconnect(
            &online_path,
            Value::Bool(true),
            user_path,
            DisconnectOp::Update(offline),
        )
        .await
}
