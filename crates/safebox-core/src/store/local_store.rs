//! Local JSON file store

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::file::{atomic_write, ensure_dir, read_if_exists, FileLock};
use super::records;
use super::traits::{Store, StoreError, StoreResult};
use crate::logging::file_logger as log;
use crate::types::{Config, ConfigInput};

/// Options for opening a local store
#[derive(Debug, Clone, Default)]
pub struct LocalStoreConfig {
    /// Directory holding the store file; created if missing
    pub directory: PathBuf,
    pub filename: String,
    /// Optional qualifier; the file becomes `{stage}-{filename}`
    pub stage: String,
}

impl LocalStoreConfig {
    pub fn new(directory: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            filename: filename.into(),
            stage: String::new(),
        }
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = stage.into();
        self
    }
}

/// Store that keeps the whole collection in one JSON file
///
/// Every operation reads the file, applies its change in memory and writes
/// the file back. The cycle runs under an in-process mutex and a sidecar
/// lock file, and the write is a rename of a fully written temp file, so a
/// batch either lands completely or not at all.
///
/// # Example
///
/// ```no_run
/// use safebox_core::store::{LocalStore, LocalStoreConfig, Store};
/// use safebox_core::ConfigInput;
///
/// # async fn run() -> safebox_core::store::StoreResult<()> {
/// let store = LocalStore::open(LocalStoreConfig::new(".safebox", "store.json").with_stage("dev"))?;
/// store.put(ConfigInput::new("/dev/orders/DB_NAME", "orders")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl LocalStore {
    /// Open (or prepare) a store, creating the directory if needed
    pub fn open(config: LocalStoreConfig) -> StoreResult<Self> {
        if config.directory.as_os_str().is_empty() {
            return Err(StoreError::configuration("invalid parameter: directory is required"));
        }
        if config.filename.is_empty() {
            return Err(StoreError::configuration("invalid parameter: filename is required"));
        }

        let filename = if config.stage.is_empty() {
            config.filename.clone()
        } else {
            format!("{}-{}", config.stage, config.filename)
        };

        ensure_dir(&config.directory)?;
        let store = Self {
            path: config.directory.join(filename),
            guard: Mutex::new(()),
        };

        // Surface an unreadable or corrupt file now rather than mid-deploy
        store.read()?;
        log::debug("LocalStore", &format!("opened {}", store.path.display()));
        Ok(store)
    }

    /// Path of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> StoreResult<Vec<Config>> {
        match read_if_exists(&self.path)? {
            Some(bytes) => records::decode(&bytes, &self.path),
            None => Ok(Vec::new()),
        }
    }

    fn write(&self, configs: &[Config]) -> StoreResult<()> {
        atomic_write(&self.path, &records::encode(configs)?)
    }

    /// Run a read/modify/write cycle inside the critical section
    fn modify<T>(&self, change: impl FnOnce(&mut Vec<Config>) -> StoreResult<T>) -> StoreResult<T> {
        let _held = self.guard.lock();
        let _lock = FileLock::acquire(&self.path)?;

        let mut configs = self.read()?;
        let result = change(&mut configs)?;
        self.write(&configs)?;
        Ok(result)
    }

    /// Read a snapshot inside the critical section
    fn snapshot(&self) -> StoreResult<Vec<Config>> {
        let _held = self.guard.lock();
        let _lock = FileLock::acquire(&self.path)?;
        self.read()
    }
}

#[async_trait]
impl Store for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn put_many(&self, inputs: Vec<ConfigInput>) -> StoreResult<()> {
        if inputs.is_empty() {
            return Ok(());
        }
        log::debug("LocalStore", &format!("put_many {} entries", inputs.len()));
        self.modify(|configs| records::apply_put(configs, &inputs, Utc::now(), &self.path))
    }

    async fn get_many(&self, inputs: &[ConfigInput]) -> StoreResult<Vec<Config>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        Ok(records::select(&self.snapshot()?, inputs))
    }

    async fn get_by_path(&self, prefix: &str) -> StoreResult<Vec<Config>> {
        Ok(records::by_prefix(&self.snapshot()?, prefix))
    }

    async fn delete_many(&self, inputs: &[ConfigInput]) -> StoreResult<()> {
        if inputs.is_empty() {
            return Ok(());
        }
        let removed = self.modify(|configs| Ok(records::apply_delete(configs, inputs)))?;
        log::debug("LocalStore", &format!("delete_many removed {}", removed));
        Ok(())
    }
}
