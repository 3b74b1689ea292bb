//! List queries: one ordering, optional range/equality bounds and a limit
//!
//! Exactly one child field (or the key, or the value itself) can be used
//! per query; compound filters are not representable.

use crate::error::TreeError;
use crate::path::validate_key;
use crate::value::{compare_keys, compare_values, ListItem};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// What the list is ordered by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    Key,
    Value,
    Child(String),
}

/// Which end of the ordered list a limit keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    First(usize),
    Last(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub order_by: OrderBy,
    pub start_at: Option<Value>,
    pub end_at: Option<Value>,
    pub limit: Option<Limit>,
}

impl Query {
    fn ordered(order_by: OrderBy) -> Self {
        Self { order_by, start_at: None, end_at: None, limit: None }
    }

    pub fn order_by_key() -> Self {
        Self::ordered(OrderBy::Key)
    }

    pub fn order_by_value() -> Self {
        Self::ordered(OrderBy::Value)
    }

    pub fn order_by_child(field: impl Into<String>) -> Self {
        Self::ordered(OrderBy::Child(field.into()))
    }

    /// Keep only items whose ordered value equals `value`.
    pub fn equal_to(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.start_at = Some(value.clone());
        self.end_at = Some(value);
        self
    }

    pub fn start_at(mut self, value: impl Into<Value>) -> Self {
        self.start_at = Some(value.into());
        self
    }

    pub fn end_at(mut self, value: impl Into<Value>) -> Self {
        self.end_at = Some(value.into());
        self
    }

    pub fn limit_to_first(mut self, n: usize) -> Self {
        self.limit = Some(Limit::First(n));
        self
    }

    pub fn limit_to_last(mut self, n: usize) -> Self {
        self.limit = Some(Limit::Last(n));
        self
    }

    /// Reject queries the store cannot answer.
    pub fn validate(&self) -> Result<(), TreeError> {
        match &self.order_by {
            OrderBy::Child(field) => {
                for seg in field.split('/') {
                    validate_key(seg).map_err(|_| {
                        TreeError::InvalidQuery(format!("cannot order by child '{}'", field))
                    })?;
                }
            }
            OrderBy::Key => {
                for bound in [&self.start_at, &self.end_at].into_iter().flatten() {
                    if !bound.is_string() {
                        return Err(TreeError::InvalidQuery(
                            "key ordering only accepts string bounds".to_string(),
                        ));
                    }
                }
            }
            OrderBy::Value => {}
        }
        if let Some(Limit::First(0) | Limit::Last(0)) = self.limit {
            return Err(TreeError::InvalidQuery("limit must be positive".to_string()));
        }
        Ok(())
    }

    /// Ordered value of an item under this query.
    fn sort_value<'a>(&self, item: &'a ListItem) -> Option<&'a Value> {
        match &self.order_by {
            OrderBy::Key => None,
            OrderBy::Value => Some(&item.value),
            OrderBy::Child(field) => {
                let mut current = &item.value;
                for seg in field.split('/') {
                    current = current.get(seg)?;
                }
                Some(current)
            }
        }
    }

    fn compare(&self, a: &ListItem, b: &ListItem) -> Ordering {
        match self.order_by {
            OrderBy::Key => compare_keys(&a.key, &b.key),
            _ => {
                let null = Value::Null;
                let va = self.sort_value(a).unwrap_or(&null);
                let vb = self.sort_value(b).unwrap_or(&null);
                compare_values(va, vb).then_with(|| compare_keys(&a.key, &b.key))
            }
        }
    }

    fn bound_cmp(&self, item: &ListItem, bound: &Value) -> Ordering {
        match self.order_by {
            OrderBy::Key => compare_keys(&item.key, bound.as_str().unwrap_or_default()),
            _ => {
                let null = Value::Null;
                compare_values(self.sort_value(item).unwrap_or(&null), bound)
            }
        }
    }

    /// Order, filter and limit a list of children.
    pub fn apply(&self, mut items: Vec<ListItem>) -> Vec<ListItem> {
        items.sort_by(|a, b| self.compare(a, b));
        items.retain(|item| {
            let above = self
                .start_at
                .as_ref()
                .map_or(true, |b| self.bound_cmp(item, b) != Ordering::Less);
            let below = self
                .end_at
                .as_ref()
                .map_or(true, |b| self.bound_cmp(item, b) != Ordering::Greater);
            above && below
        });
        match self.limit {
            Some(Limit::First(n)) => items.truncate(n),
            Some(Limit::Last(n)) => {
                let skip = items.len().saturating_sub(n);
                items.drain(..skip);
            }
            None => {}
        }
        items
    }
}
