//! In-memory configuration store

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::records;
use super::traits::{Store, StoreResult};
use crate::types::{Config, ConfigInput};

/// In-memory store for testing and dry runs
///
/// Applies the same versioning rules as the file stores. Records are lost
/// when the store is dropped.
///
/// # Example
///
/// ```
/// use safebox_core::store::MemoryStore;
///
/// let store = MemoryStore::new();
/// assert!(store.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    configs: RwLock<Vec<Config>>,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self {
            configs: RwLock::new(Vec::new()),
        }
    }

    /// Create a memory store with initial records
    pub fn with_configs(initial: Vec<Config>) -> Self {
        Self {
            configs: RwLock::new(initial),
        }
    }

    /// Snapshot of every record
    pub fn all(&self) -> Vec<Config> {
        self.configs.read().clone()
    }

    pub fn len(&self) -> usize {
        self.configs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put_many(&self, inputs: Vec<ConfigInput>) -> StoreResult<()> {
        let mut configs = self.configs.write();
        // Mutate a copy so a failed batch leaves nothing behind
        let mut next = configs.clone();
        records::apply_put(&mut next, &inputs, Utc::now(), std::path::Path::new("memory"))?;
        *configs = next;
        Ok(())
    }

    async fn get_many(&self, inputs: &[ConfigInput]) -> StoreResult<Vec<Config>> {
        let configs = self.configs.read();
        Ok(records::select(&configs, inputs))
    }

    async fn get_by_path(&self, prefix: &str) -> StoreResult<Vec<Config>> {
        let configs = self.configs.read();
        Ok(records::by_prefix(&configs, prefix))
    }

    async fn delete_many(&self, inputs: &[ConfigInput]) -> StoreResult<()> {
        let mut configs = self.configs.write();
        records::apply_delete(&mut configs, inputs);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_crud() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.put(ConfigInput::new("/a/b", "1")).await.unwrap();
        store.put(ConfigInput::new("/a/b", "2")).await.unwrap();
        assert_eq!(store.len(), 1);

        let found = store.get(&ConfigInput::named("/a/b")).await.unwrap().unwrap();
        assert_eq!(found.value, "2");
        assert_eq!(found.version, "2");

        store.delete_many(&[ConfigInput::named("/a/b")]).await.unwrap();
        assert!(store.get(&ConfigInput::named("/a/b")).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_failed_batch_leaves_no_trace() {
        let mut bad = Config::first_version(&ConfigInput::new("/bad", "x"), Utc::now());
        bad.version = "not-a-number".into();
        let store = MemoryStore::with_configs(vec![bad]);

        let result = store
            .put_many(vec![ConfigInput::new("/new", "1"), ConfigInput::new("/bad", "y")])
            .await;
        assert!(result.is_err());
        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].value, "x");
    }

    #[test]
    fn test_memory_store_name() {
        assert_eq!(MemoryStore::new().name(), "memory");
    }
}
