//! TreeAdapter - generic path-addressed access to the tree store
//!
//! Thin facade over a `TreeTransport`: one-time reads, live subscriptions,
//! writes, list helpers, presence and on-disconnect hooks. Paths are handed
//! through as given; the store rejects malformed ones.

use crate::presence::PresenceMonitor;
use crate::subscription::Subscription;
use crate::transport::TreeTransport;
use arbor_model::path::validate_key;
use arbor_model::{
    children_of, DisconnectOp, ListItem, Map, Path, Query, Snapshot, TreeError, TreeResult, Value,
};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio_stream::wrappers::WatchStream;

#[derive(Clone)]
pub struct TreeAdapter {
    transport: Arc<dyn TreeTransport>,
    presence_root: Arc<str>,
}

impl TreeAdapter {
    pub fn new(transport: Arc<dyn TreeTransport>) -> Self {
        Self { transport, presence_root: Arc::from("users") }
    }

    /// Parent node for presence records.
    pub fn with_presence_root(mut self, root: &str) -> Self {
        self.presence_root = Arc::from(root.trim_matches('/'));
        self
    }

    // ==================== One-time reads ====================

    /// Current value at `path`, `Null` when absent.
    pub async fn read_once(&self, path: &str) -> TreeResult<Value> {
        self.transport.get(path).await
    }

    /// Current value together with its key.
    pub async fn read_snapshot(&self, path: &str) -> TreeResult<Snapshot> {
        let value = self.transport.get(path).await?;
        Ok(Snapshot { key: last_segment(path), value })
    }

    /// Children of `path` in key order. Empty when absent or scalar.
    pub async fn read_list(&self, path: &str) -> TreeResult<Vec<ListItem>> {
        let value = self.transport.get(path).await?;
        Ok(children_of(&value))
    }

    pub async fn read_list_query(&self, path: &str, query: Query) -> TreeResult<Vec<ListItem>> {
        self.transport.query(path, query).await
    }

    pub async fn read_object(&self, path: &str) -> TreeResult<Value> {
        self.transport.get(path).await
    }

    /// Typed read. `None` when nothing is stored at `path`.
    pub async fn read_object_as<T: DeserializeOwned>(&self, path: &str) -> TreeResult<Option<T>> {
        let value = self.transport.get(path).await?;
        from_value(value)
    }

    // ==================== Subscriptions ====================

    /// Children of `path` (optionally filtered) on every change.
    pub async fn subscribe_list(
        &self,
        path: &str,
        query: Option<Query>,
    ) -> TreeResult<Subscription<Vec<ListItem>>> {
        match query {
            Some(query) => {
                let stream = self.transport.listen_query(path, query).await?;
                Ok(Subscription::new(stream.map(Ok)))
            }
            None => {
                let stream = self.transport.listen(path).await?;
                Ok(Subscription::new(stream.map(|value| Ok(children_of(&value)))))
            }
        }
    }

    /// Like `subscribe_list`, without the keys.
    pub async fn subscribe_list_values(
        &self,
        path: &str,
        query: Option<Query>,
    ) -> TreeResult<Subscription<Vec<Value>>> {
        let items = self.subscribe_list(path, query).await?;
        Ok(Subscription::new(items.map(|batch| {
            batch.map(|items| items.into_iter().map(|item| item.value).collect())
        })))
    }

    /// Value at `path` on every change (`Null` while absent).
    pub async fn subscribe_object(&self, path: &str) -> TreeResult<Subscription<Value>> {
        let stream = self.transport.listen(path).await?;
        Ok(Subscription::new(stream.map(Ok)))
    }

    /// Typed `subscribe_object`. A value that fails to deserialize is
    /// delivered as an error item; the subscription stays open.
    pub async fn subscribe_object_as<T>(&self, path: &str) -> TreeResult<Subscription<Option<T>>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let stream = self.transport.listen(path).await?;
        Ok(Subscription::new(stream.map(from_value)))
    }

    // ==================== Writes ====================

    /// Replace the node at `path`.
    pub async fn write<T: Serialize + ?Sized>(&self, path: &str, value: &T) -> TreeResult<()> {
        self.transport.set(path, to_value(value)?).await
    }

    /// Merge `partial` into the node at `path`. Keys may be relative
    /// multi-segment paths; a `null` child removes it.
    pub async fn update<T: Serialize + ?Sized>(&self, path: &str, partial: &T) -> TreeResult<()> {
        self.transport.update(path, to_object(partial)?).await
    }

    pub async fn remove(&self, path: &str) -> TreeResult<()> {
        self.transport.remove(path).await
    }

    /// Add `value` under a new store-generated key and return the key.
    pub async fn append<T: Serialize + ?Sized>(&self, path: &str, value: &T) -> TreeResult<String> {
        self.transport.push(path, to_value(value)?).await
    }

    // ==================== List items ====================

    pub async fn set_list_item<T: Serialize + ?Sized>(
        &self,
        path: &str,
        key: &str,
        value: &T,
    ) -> TreeResult<()> {
        self.write(&child_path(path, key)?, value).await
    }

    pub async fn update_list_item<T: Serialize + ?Sized>(
        &self,
        path: &str,
        key: &str,
        partial: &T,
    ) -> TreeResult<()> {
        self.update(&child_path(path, key)?, partial).await
    }

    pub async fn remove_list_item(&self, path: &str, key: &str) -> TreeResult<()> {
        self.remove(&child_path(path, key)?).await
    }

    /// Remove the whole list node.
    pub async fn remove_list(&self, path: &str) -> TreeResult<()> {
        self.remove(path).await
    }

    /// A fresh time-ordered key, generated locally without writing.
    pub fn generate_key(&self) -> String {
        self.transport.next_push_id()
    }

    // ==================== Presence & hooks ====================

    /// Track `user_id`'s online state under the presence root until the
    /// returned monitor is stopped or dropped.
    pub fn monitor_presence(&self, user_id: &str) -> PresenceMonitor {
        let user_path = format!("{}/{}", self.presence_root, user_id);
        PresenceMonitor::start(self.transport.clone(), user_path)
    }

    /// Have the store write `value` at `path` once this client's session drops.
    pub async fn on_disconnect_set<T: Serialize + ?Sized>(
        &self,
        path: &str,
        value: &T,
    ) -> TreeResult<()> {
        let op = DisconnectOp::Set(to_value(value)?);
        self.transport.on_disconnect(path, op).await
    }

    pub async fn on_disconnect_update<T: Serialize + ?Sized>(
        &self,
        path: &str,
        partial: &T,
    ) -> TreeResult<()> {
        let op = DisconnectOp::Update(to_object(partial)?);
        self.transport.on_disconnect(path, op).await
    }

    pub async fn on_disconnect_remove(&self, path: &str) -> TreeResult<()> {
        self.transport.on_disconnect(path, DisconnectOp::Remove).await
    }

    /// Drop hooks registered at or below `path` for the current session.
    pub async fn cancel_on_disconnect(&self, path: &str) -> TreeResult<()> {
        self.transport.cancel_on_disconnect(path).await
    }

    // ==================== Connection ====================

    /// Server clock minus client clock in milliseconds; a new estimate is
    /// emitted on every connection.
    pub fn server_time_offset(&self) -> Subscription<i64> {
        Subscription::new(WatchStream::new(self.transport.server_time_offset()).map(Ok))
    }

    /// `true` while a session to the store is open.
    pub fn connection_state(&self) -> Subscription<bool> {
        Subscription::new(WatchStream::new(self.transport.connected()).map(Ok))
    }
}

impl std::fmt::Debug for TreeAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeAdapter")
            .field("presence_root", &self.presence_root)
            .finish_non_exhaustive()
    }
}

/// `path/key` for a single list item. The key must name exactly one child;
/// an empty one would otherwise address the whole list.
fn child_path(path: &str, key: &str) -> TreeResult<String> {
    if key.trim().is_empty() {
        return Err(TreeError::InvalidPath(format!("empty item key under '{}'", path)));
    }
    validate_key(key)?;
    Ok(format!("{}/{}", path.trim_end_matches('/'), key))
}

fn last_segment(path: &str) -> Option<String> {
    Path::parse(path).ok().map(|p| p.key().to_string())
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> TreeResult<Value> {
    Ok(serde_json::to_value(value)?)
}

fn to_object<T: Serialize + ?Sized>(partial: &T) -> TreeResult<Map<String, Value>> {
    match to_value(partial)? {
        Value::Object(map) => Ok(map),
        other => Err(TreeError::Serialization(format!(
            "update expects an object, got {}",
            other
        ))),
    }
}

fn from_value<T: DeserializeOwned>(value: Value) -> TreeResult<Option<T>> {
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_path() {
        assert_eq!(child_path("friends", "f1").unwrap(), "friends/f1");
        assert_eq!(child_path("friends/", "f1").unwrap(), "friends/f1");
        assert!(child_path("friends", "").is_err());
        assert!(child_path("friends", "  ").is_err());
        assert!(child_path("friends", "a/b").is_err());
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("/friends/f1/"), Some("f1".to_string()));
        assert_eq!(last_segment("/"), None);
    }

    #[test]
    fn test_to_object_rejects_scalars() {
        let err = to_object(&5).unwrap_err();
        assert_eq!(err.code(), "invalid-argument");
        assert_eq!(to_object(&serde_json::json!({"a": 1})).unwrap().len(), 1);
    }
}
