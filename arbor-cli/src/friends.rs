//! Friend list kept under `friends/{id}`

use arbor_client::TreeAdapter;
use arbor_model::{ListItem, TreeError, TreeResult, Value};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

pub const FRIENDS: &str = "friends";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Friend {
    /// List key; not stored inside the record.
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub family: String,
}

impl Friend {
    pub fn new(name: impl Into<String>, family: impl Into<String>) -> Self {
        Self { id: String::new(), name: name.into(), family: family.into() }
    }

    fn from_item(item: ListItem) -> TreeResult<Self> {
        let mut friend: Friend = serde_json::from_value(item.value)?;
        friend.id = item.key;
        Ok(friend)
    }
}

/// Trim every top-level string field of an object. Anything else is
/// returned unchanged.
pub fn trim_string_values(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| match v {
                    Value::String(s) => (k, Value::String(s.trim().to_string())),
                    other => (k, other),
                })
                .collect(),
        ),
        other => other,
    }
}

#[derive(Debug, Clone)]
pub struct FriendsService {
    db: TreeAdapter,
}

impl FriendsService {
    pub fn new(db: TreeAdapter) -> Self {
        Self { db }
    }

    /// Store a new friend and return its generated id.
    pub async fn add_friend(&self, friend: &Friend) -> TreeResult<String> {
        let value = trim_string_values(serde_json::to_value(friend)?);
        self.db.append(FRIENDS, &value).await
    }

    /// Replace the stored record for `friend.id`.
    pub async fn update_friend(&self, friend: &Friend) -> TreeResult<()> {
        let id = require_id(&friend.id)?;
        let value = trim_string_values(serde_json::to_value(friend)?);
        self.db.set_list_item(FRIENDS, id, &value).await
    }

    pub async fn remove_friend(&self, id: &str) -> TreeResult<()> {
        let id = require_id(id)?;
        self.db.remove_list_item(FRIENDS, id).await
    }

    pub async fn list_friends(&self) -> TreeResult<Vec<Friend>> {
        self.db
            .read_list(FRIENDS)
            .await?
            .into_iter()
            .map(Friend::from_item)
            .collect()
    }

    /// The full friend list, again after every change.
    pub async fn watch_friends(&self) -> TreeResult<impl Stream<Item = TreeResult<Vec<Friend>>>> {
        let sub = self.db.subscribe_list(FRIENDS, None).await?;
        Ok(sub.map(|batch: TreeResult<Vec<ListItem>>| -> TreeResult<Vec<Friend>> {
            batch?.into_iter().map(Friend::from_item).collect()
        }))
    }
}

// An empty id would address the whole list.
fn require_id(id: &str) -> TreeResult<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(TreeError::InvalidPath("friend id must not be empty".to_string()));
    }
    Ok(id)
}
