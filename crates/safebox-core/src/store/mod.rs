//! Configuration store abstractions and implementations
//!
//! This module provides a pluggable store system with:
//! - `Store` trait: the six CRUD operations every backend implements
//! - File-backed implementations: `LocalStore`, `GpgStore`
//! - `MemoryStore` for tests
//! - A factory that builds a store from a provider identifier
//!
//! The managed-service backends live in [`crate::remote`].

mod traits;
pub mod records;
mod file;
mod local_store;
mod gpg_store;
mod memory_store;
mod factory;

pub use traits::{Store, StoreError, StoreResult};
pub use file::FileLock;
pub use local_store::{LocalStore, LocalStoreConfig};
pub use gpg_store::{Cipher, GpgCli, GpgStore, GpgStoreOptions};
pub use memory_store::MemoryStore;
pub use factory::{
    create_store, list_providers, Provider, ProviderDefinition, StoreConfig, StoreFactory,
    DEFAULT_LOCAL_FILENAME,
};
