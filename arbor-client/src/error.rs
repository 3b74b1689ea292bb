use arbor_model::TreeError;
use thiserror::Error;

/// Errors from client setup and teardown. Tree operations themselves
/// return `TreeError`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),
}
