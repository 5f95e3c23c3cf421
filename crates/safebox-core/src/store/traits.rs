//! Core trait and error types for configuration stores

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Config, ConfigInput};

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Bad provider identifier or missing backend parameter
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Persisted data exists but cannot be parsed
    #[error("Corrupt store at {}: {reason}", .path.display())]
    CorruptState { path: PathBuf, reason: String },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Another process holds the store lock
    #[error("Store is locked: {}", .path.display())]
    Locked { path: PathBuf },

    #[error("Cipher error: {0}")]
    Cipher(String),

    /// The remote service rejected a request
    #[error("{service} error: {message}")]
    Remote { service: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptState {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn remote(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Absence is recoverable; callers decide whether it matters
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for configuration store backends
///
/// Implementations:
/// - `LocalStore`: JSON file on disk
/// - `GpgStore`: GPG-encrypted JSON file
/// - `ParameterStore`: managed hierarchical parameter service
/// - `SecretsManagerStore`: managed flat secrets service
/// - `MemoryStore`: in-memory, for testing
///
/// Backends validate their medium when constructed, so a store value that
/// exists is ready for reads and writes.
#[async_trait]
pub trait Store: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Upsert a single entry
    async fn put(&self, input: ConfigInput) -> StoreResult<()> {
        self.put_many(vec![input]).await
    }

    /// Upsert a batch
    ///
    /// Existing names get their version bumped by one and their value,
    /// type and modified time replaced. New names start at version `"1"`.
    /// The batch is written as a whole or an error is returned.
    async fn put_many(&self, inputs: Vec<ConfigInput>) -> StoreResult<()>;

    /// Current record for a name, `None` if absent
    async fn get(&self, input: &ConfigInput) -> StoreResult<Option<Config>> {
        let mut found = self.get_many(std::slice::from_ref(input)).await?;
        Ok(found.pop())
    }

    /// Records for a set of names; absent names are omitted
    async fn get_many(&self, inputs: &[ConfigInput]) -> StoreResult<Vec<Config>>;

    /// Every record whose name starts with `prefix`
    async fn get_by_path(&self, prefix: &str) -> StoreResult<Vec<Config>>;

    /// Remove records by name; absent names are ignored
    async fn delete_many(&self, inputs: &[ConfigInput]) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_recoverable() {
        assert!(StoreError::NotFound("x".into()).is_not_found());
        assert!(!StoreError::configuration("bad").is_not_found());
    }

    #[test]
    fn test_error_messages() {
        let err = StoreError::corrupt("/tmp/store.json", "expected value at line 1");
        assert_eq!(
            err.to_string(),
            "Corrupt store at /tmp/store.json: expected value at line 1"
        );

        let err = StoreError::remote("ssm", "AccessDenied");
        assert_eq!(err.to_string(), "ssm error: AccessDenied");
    }
}
