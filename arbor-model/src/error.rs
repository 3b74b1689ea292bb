use thiserror::Error;

/// Errors surfaced by every tree operation.
///
/// Two families: transport/availability failures reported by the store or
/// the channel to it, and malformed input rejected when the call reaches
/// the store. Nothing is retried; each error is terminal for its call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("channel closed")]
    Closed,
}

impl TreeError {
    /// Stable string code, matching the codes the hosted backend reports.
    pub fn code(&self) -> &'static str {
        match self {
            TreeError::Unavailable(_) => "unavailable",
            TreeError::PermissionDenied(_) => "permission-denied",
            TreeError::QuotaExceeded(_) => "resource-exhausted",
            TreeError::InvalidPath(_)
            | TreeError::InvalidQuery(_)
            | TreeError::Serialization(_) => "invalid-argument",
            TreeError::Closed => "cancelled",
        }
    }

    /// True for errors caused by the transport rather than the request.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            TreeError::Unavailable(_)
                | TreeError::PermissionDenied(_)
                | TreeError::QuotaExceeded(_)
                | TreeError::Closed
        )
    }
}

impl From<serde_json::Error> for TreeError {
    fn from(e: serde_json::Error) -> Self {
        TreeError::Serialization(e.to_string())
    }
}

pub type TreeResult<T> = Result<T, TreeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(TreeError::Unavailable("x".into()).code(), "unavailable");
        assert_eq!(TreeError::QuotaExceeded("x".into()).code(), "resource-exhausted");
        assert_eq!(TreeError::InvalidQuery("x".into()).code(), "invalid-argument");
        assert!(TreeError::Closed.is_transport());
        assert!(!TreeError::InvalidPath("".into()).is_transport());
    }
}
