//! Client configuration
//!
//! Mirrors the handful of literals a front end passes when it initialises
//! the backend SDK, plus the knobs the adapter itself reads.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_APP_NAME: &str = "[DEFAULT]";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Name distinguishing several clients in one process (shows up in logs).
    pub app_name: String,
    /// Backend project identifier, informational.
    pub project_id: Option<String>,
    /// Database location. Only `memory://` (in-process) is understood here.
    #[serde(rename = "databaseURL")]
    pub database_url: String,
    /// Open a session as part of building the client.
    pub auto_connect: bool,
    /// Parent node for presence records (`{presenceRoot}/{userId}`).
    pub presence_root: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            project_id: None,
            database_url: "memory://default".to_string(),
            auto_connect: true,
            presence_root: "users".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.app_name.trim().is_empty() {
            return Err(ClientError::Config("appName must not be empty".to_string()));
        }
        if !self.database_url.starts_with("memory://") {
            return Err(ClientError::Config(format!(
                "unsupported databaseURL '{}': only memory:// stores are available",
                self.database_url
            )));
        }
        if self.presence_root.trim_matches('/').is_empty() {
            return Err(ClientError::Config("presenceRoot must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let text = r#"{
            "appName": "friends-demo",
            "projectId": "demo-123",
            "databaseURL": "memory://friends"
        }"#;
        file.write_all(text.as_bytes()).unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.app_name, "friends-demo");
        assert_eq!(config.database_url, "memory://friends");
        assert_eq!(config.project_id.as_deref(), Some("demo-123"));
        assert_eq!(config.presence_root, "users");
        assert!(config.auto_connect);
    }

    #[test]
    fn test_serializes_database_url_key() {
        let json = serde_json::to_value(ClientConfig::default()).unwrap();
        assert_eq!(json["databaseURL"], "memory://default");
        assert!(json.get("databaseUrl").is_none());
    }

    #[test]
    fn test_rejects_remote_urls() {
        let config = ClientConfig {
            database_url: "https://tree.example.com".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ClientError::Config(_))));
    }
}
