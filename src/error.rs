use thiserror::Error;

/// Failure reported by a host callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("host callback failed: {0}")]
    Callback(String),
    #[error("host is unavailable")]
    Unavailable,
}

/// Persistence failures for projects and settings.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no config directory available on this platform")]
    NoConfigDir,
}
