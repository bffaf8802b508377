// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;

#[derive(thiserror::Error, Debug)]
pub enum StateError {
    #[error("State store at {0} is locked; another instance may be running")]
    AlreadyInUse(String),

    #[error("State key not found: {0}")]
    NotFound(String),

    #[error("Invalid value stored under {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("State database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("State I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable key-value store holding the sync state.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>, StateError>;

    /// Get several values at once; the result is aligned with `keys`
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, StateError>;

    /// Insert or overwrite a value
    async fn put(&self, key: &str, value: &str) -> Result<(), StateError>;

    /// Remove every key
    async fn clear(&self) -> Result<(), StateError>;
}
