//! Deferred writes executed by the store when a session drops

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A write registered ahead of time and run by the store, not the client,
/// once the client's channel is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "value")]
pub enum DisconnectOp {
    Set(Value),
    Update(Map<String, Value>),
    Remove,
}
