use arbor_model::{Path, TreeError};
use serde::{Deserialize, Serialize};

/// Store-side limits and access rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path prefixes no client may write to (or overwrite through an ancestor).
    pub locked_paths: Vec<String>,
    /// Largest serialized value accepted by a single write.
    pub max_write_bytes: Option<usize>,
    /// Capacity of the actor's command queue.
    pub command_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            locked_paths: Vec::new(),
            max_write_bytes: None,
            command_buffer: 1024,
        }
    }
}

/// Parsed form of `StoreConfig` used by the actor.
#[derive(Debug, Clone, Default)]
pub(crate) struct AccessRules {
    locked: Vec<Path>,
    max_write_bytes: Option<usize>,
}

impl AccessRules {
    pub(crate) fn from_config(config: &StoreConfig) -> Result<Self, TreeError> {
        let locked = config
            .locked_paths
            .iter()
            .map(|p| Path::parse(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { locked, max_write_bytes: config.max_write_bytes })
    }

    pub(crate) fn check_write(&self, path: &Path) -> Result<(), TreeError> {
        if let Some(lock) = self.locked.iter().find(|lock| lock.overlaps(path)) {
            return Err(TreeError::PermissionDenied(format!(
                "write to '{}' touches locked path '{}'",
                path, lock
            )));
        }
        Ok(())
    }

    pub(crate) fn check_size(&self, value: &serde_json::Value) -> Result<(), TreeError> {
        let Some(max) = self.max_write_bytes else {
            return Ok(());
        };
        let size = serde_json::to_vec(value)?.len();
        if size > max {
            return Err(TreeError::QuotaExceeded(format!(
                "write of {} bytes exceeds limit of {}",
                size, max
            )));
        }
        Ok(())
    }
}
