//! Safebox Core
//!
//! Keeps configuration and secrets for a service in one of several
//! backing stores and reconciles them with a declared set of entries.
//!
//! ## Deploying
//!
//! A `Manifest` (`safebox.yml`) resolves to a `DeployPlan` and a
//! `StoreConfig`. The factory builds the store once; the `Deployer` writes
//! only what changed:
//!
//! ```rust,ignore
//! use safebox_core::{create_store, Deployer, FileExporter, LinePrompter, Manifest, PromptMode};
//!
//! let resolved = Manifest::load("safebox.yml")?.resolve("prod")?;
//! let store = create_store(&resolved.store_config).await?;
//!
//! let plan = resolved.plan.with_prompt(PromptMode::Missing).remove_orphans(true);
//! let report = Deployer::new(store)
//!     .with_prompter(Arc::new(LinePrompter::stdio()))
//!     .with_generator(Arc::new(FileExporter::new()))
//!     .deploy(&plan)
//!     .await?;
//! println!("{}", report.summary());
//! ```
//!
//! ## Backends
//!
//! - `ssm`: managed parameter service ([`ParameterStore`])
//! - `secrets-manager`: managed secrets service ([`SecretsManagerStore`])
//! - `gpg`: GPG-encrypted JSON file ([`GpgStore`])
//! - `local`: plain JSON file ([`LocalStore`])

pub mod types;
pub mod store;
pub mod remote;
pub mod deploy;
pub mod list;
pub mod export;
pub mod manifest;
pub mod logging;

// Re-export commonly used types
pub use types::{Config, ConfigInput, ConfigType};

pub use store::{
    Store, StoreError, StoreResult,
    LocalStore, LocalStoreConfig, GpgStore, GpgStoreOptions, Cipher, GpgCli, MemoryStore,
    StoreConfig, StoreFactory, Provider, create_store, list_providers,
};

pub use remote::{
    RemoteService, ServiceConnector, FixedConnector, InMemoryService,
    ParameterStore, SecretsManagerStore,
};

pub use deploy::{
    Deployer, DeployPlan, DeployReport, DeployError, PartialFailure,
    PromptMode, Prompter, LinePrompter, PromptError,
    FileGenerator, GenerateTarget,
};

pub use list::{list_configs, sort_configs, SortOrder};

pub use export::{export_params, write_export, ExportError, ExportFormat, FileExporter};

pub use manifest::{Manifest, ManifestError, ResolvedManifest};

pub use logging::{Logger, NoOpLogger, ConsoleLogger};
