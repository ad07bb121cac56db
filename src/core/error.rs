//! Error types for executor operations.

use thiserror::Error;

/// Errors produced by the bounded executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The executor has been shut down; the task was never accepted.
    #[error("executor has been shut down")]
    Shutdown,
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread")]
    Spawn(#[from] std::io::Error),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
