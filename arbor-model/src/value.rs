//! Node values, list items and ordering rules

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Key of the server-value placeholder object.
pub const SERVER_VALUE_KEY: &str = ".sv";

/// Placeholder the store replaces with its own clock when applying a write.
pub fn server_timestamp() -> Value {
    let mut map = Map::new();
    map.insert(SERVER_VALUE_KEY.to_string(), Value::String("timestamp".to_string()));
    Value::Object(map)
}

/// True if `value` is exactly a server timestamp placeholder.
pub fn is_server_timestamp(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.len() == 1
                && map.get(SERVER_VALUE_KEY).and_then(Value::as_str) == Some("timestamp")
        }
        _ => false,
    }
}

/// Replace every server timestamp placeholder in `value` with `now_ms`.
pub fn resolve_server_values(value: &mut Value, now_ms: u64) {
    if is_server_timestamp(value) {
        *value = Value::from(now_ms);
        return;
    }
    match value {
        Value::Object(map) => map.values_mut().for_each(|v| resolve_server_values(v, now_ms)),
        Value::Array(items) => items.iter_mut().for_each(|v| resolve_server_values(v, now_ms)),
        _ => {}
    }
}

/// Value observed at a path, paired with the path's last segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub key: Option<String>,
    pub value: Value,
}

impl Snapshot {
    pub fn exists(&self) -> bool {
        !self.value.is_null()
    }
}

/// One child of a list node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub key: String,
    pub value: Value,
}

impl ListItem {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self { key: key.into(), value }
    }
}

/// Children of `value` as list items in key order. Scalars have no children.
pub fn children_of(value: &Value) -> Vec<ListItem> {
    let mut items: Vec<ListItem> = match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| ListItem::new(k.clone(), v.clone()))
            .collect(),
        Value::Array(entries) => entries
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| ListItem::new(i.to_string(), v.clone()))
            .collect(),
        _ => Vec::new(),
    };
    items.sort_by(|a, b| compare_keys(&a.key, &b.key));
    items
}

/// Key order: 32-bit integer keys numerically first, then everything else
/// lexicographically.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    match (as_int_key(a), as_int_key(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn as_int_key(key: &str) -> Option<i32> {
    // "01" or "+1" are strings, not integers
    let canonical = key == "0"
        || (!key.starts_with('0') && !key.starts_with('+') && !key.starts_with("-0"));
    if !canonical {
        return None;
    }
    key.parse::<i32>().ok()
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Object(_) | Value::Array(_) => 5,
    }
}

/// Value order used by queries: null < false < true < numbers < strings <
/// objects. Objects compare equal to each other.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match type_rank(a).cmp(&type_rank(b)) {
        Ordering::Equal => {}
        other => return other,
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Strip nulls and empty containers so that "absent" has one representation.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if cleaned.is_empty() {
                Value::Null
            } else {
                Value::Object(cleaned)
            }
        }
        Value::Array(items) => {
            if items.is_empty() {
                return Value::Null;
            }
            // Arrays are stored as index-keyed objects so children stay addressable
            let cleaned: Map<String, Value> = items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), normalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if cleaned.is_empty() {
                Value::Null
            } else {
                Value::Object(cleaned)
            }
        }
        other => other,
    }
}

/// Stored form back to the form clients wrote: an object whose keys are all
/// non-negative integer keys reads back as an array, with `null` in the
/// holes. Sparse index maps (more holes than entries) stay objects.
pub fn denormalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let map: Map<String, Value> =
                map.into_iter().map(|(k, v)| (k, denormalize(v))).collect();
            let Some(len) = array_len(&map) else {
                return Value::Object(map);
            };
            let mut items = vec![Value::Null; len];
            for (key, v) in map {
                if let Some(slot) = key.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                    *slot = v;
                }
            }
            Value::Array(items)
        }
        other => other,
    }
}

fn array_len(map: &Map<String, Value>) -> Option<usize> {
    if map.is_empty() {
        return None;
    }
    let mut max = 0usize;
    for key in map.keys() {
        let index = as_int_key(key).filter(|i| *i >= 0)?;
        max = max.max(index as usize);
    }
    let len = max + 1;
    (len <= map.len() * 2).then_some(len)
}
