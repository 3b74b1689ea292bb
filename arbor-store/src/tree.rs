//! In-memory JSON tree
//!
//! Pure data operations with no notion of listeners or sessions. Values
//! are normalised on the way in, so `null` never appears inside the tree
//! and empty objects are pruned together with their now-empty parents.
//! Arrays are kept as index-keyed objects and turned back into arrays on
//! the way out.

use arbor_model::value::{denormalize, normalize};
use arbor_model::{Map, Path, TreeError, Value};

#[derive(Debug, Default)]
pub struct Tree {
    root: Map<String, Value>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value at `path`, `Null` when absent.
    pub fn get(&self, path: &Path) -> Value {
        let mut segments = path.segments().iter();
        let Some(first) = segments.next() else {
            return Value::Null;
        };
        let mut current = match self.root.get(first) {
            Some(v) => v,
            None => return Value::Null,
        };
        for seg in segments {
            match current.as_object().and_then(|m| m.get(seg)) {
                Some(v) => current = v,
                None => return Value::Null,
            }
        }
        denormalize(current.clone())
    }

    /// Replace the node at `path`. Writing `Null` removes it.
    pub fn set(&mut self, path: &Path, value: Value) {
        set_at(&mut self.root, path.segments(), normalize(value));
    }

    /// Resolve an update's child keys into absolute paths.
    ///
    /// Fails as a whole when a key is malformed or two keys overlap, so
    /// that nothing is applied for a bad update.
    pub fn plan_update(
        path: &Path,
        children: Map<String, Value>,
    ) -> Result<Vec<(Path, Value)>, TreeError> {
        let writes = children
            .into_iter()
            .map(|(rel, value)| Ok((path.join(&rel)?, value)))
            .collect::<Result<Vec<_>, TreeError>>()?;

        for (i, (a, _)) in writes.iter().enumerate() {
            if let Some((b, _)) = writes[i + 1..].iter().find(|(b, _)| a.overlaps(b)) {
                return Err(TreeError::InvalidPath(format!(
                    "update paths '{}' and '{}' overlap",
                    a, b
                )));
            }
        }
        Ok(writes)
    }

    /// Whole tree as a single value (`Null` when empty).
    pub fn export(&self) -> Value {
        if self.root.is_empty() {
            Value::Null
        } else {
            denormalize(Value::Object(self.root.clone()))
        }
    }

    /// Replace the whole tree. Non-object roots leave the tree empty.
    pub fn import(&mut self, value: Value) {
        self.root = match normalize(value) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
    }
}

fn set_at(node: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        if value.is_null() {
            node.remove(head);
        } else {
            node.insert(head.clone(), value);
        }
        return;
    }

    if value.is_null() {
        let now_empty = match node.get_mut(head) {
            Some(Value::Object(child)) => {
                set_at(child, rest, value);
                child.is_empty()
            }
            _ => false,
        };
        if now_empty {
            node.remove(head);
        }
        return;
    }

    let entry = node
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        // A scalar in the way is overwritten by the deeper write
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(child) = entry {
        set_at(child, rest, value);
    }
}
