use thiserror::Error;

/// Errors returned by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store: record not found: {0}")]
    NotFound(String),

    /// Transport, authentication or filesystem failure.
    #[error("store: backend unavailable: {0}")]
    Unavailable(String),

    #[error("store: invalid record name: {0:?}")]
    InvalidName(String),

    #[error("store: invalid configuration: {0}")]
    Config(String),
}
