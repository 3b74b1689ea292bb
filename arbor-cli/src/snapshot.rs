//! Tree snapshot file: loaded into the store at start, written back on exit

use anyhow::Context;
use arbor_store::StoreHandle;
use std::path::{Path, PathBuf};
use tracing::debug;

pub fn default_data_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("./data"))
        .join("arbor")
        .join("tree.json")
}

/// Import `path` into the store. A missing file means an empty tree.
pub async fn load(store: &StoreHandle, path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        debug!(path = %path.display(), "No snapshot, starting empty");
        return Ok(());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let value = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?;
    store.import(value).await?;
    debug!(path = %path.display(), "Snapshot loaded");
    Ok(())
}

pub async fn save(store: &StoreHandle, path: &Path) -> anyhow::Result<()> {
    let value = store.export().await?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&value)?)
        .with_context(|| format!("writing {}", path.display()))?;
    debug!(path = %path.display(), "Snapshot saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_store::StoreConfig;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_then_load_into_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tree.json");

        let store = StoreHandle::spawn(StoreConfig::default()).unwrap();
        store.set("friends/f1/name", json!("Ann")).await.unwrap();
        save(&store, &path).await.unwrap();

        let fresh = StoreHandle::spawn(StoreConfig::default()).unwrap();
        load(&fresh, &path).await.unwrap();
        assert_eq!(fresh.get("friends/f1").await.unwrap(), json!({"name": "Ann"}));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_tree() {
        let dir = tempfile::tempdir().unwrap();
        let store = StoreHandle::spawn(StoreConfig::default()).unwrap();
        load(&store, &dir.path().join("absent.json")).await.unwrap();
        assert_eq!(store.export().await.unwrap(), serde_json::Value::Null);
    }
}
