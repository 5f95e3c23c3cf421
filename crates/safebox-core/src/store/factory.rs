//! Store factory: provider identifier + connection parameters → backend
//!
//! This is the only place that reads provider-specific parameters. Callers
//! build one store at startup and pass it to whatever needs it.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::gpg_store::{Cipher, GpgCli, GpgStore, GpgStoreOptions};
use super::local_store::{LocalStore, LocalStoreConfig};
use super::traits::{Store, StoreError, StoreResult};
use crate::remote::{ParameterStore, RemoteService, SecretsManagerStore, ServiceConnector, ServiceKind};

/// File name used by the local store when only a directory is known
pub const DEFAULT_LOCAL_FILENAME: &str = "store.json";

/// Backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Ssm,
    SecretsManager,
    Gpg,
    Local,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Ssm => "ssm",
            Provider::SecretsManager => "secrets-manager",
            Provider::Gpg => "gpg",
            Provider::Local => "local",
        }
    }
}

impl FromStr for Provider {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PROVIDERS
            .iter()
            .find(|def| def.id == s)
            .map(|def| def.provider)
            .ok_or_else(|| StoreError::configuration(format!("invalid provider `{}`", s)))
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition of a selectable provider
#[derive(Debug)]
pub struct ProviderDefinition {
    pub id: &'static str,
    pub provider: Provider,
    pub description: &'static str,
}

static PROVIDERS: Lazy<Vec<ProviderDefinition>> = Lazy::new(|| {
    vec![
        ProviderDefinition {
            id: Provider::Ssm.as_str(),
            provider: Provider::Ssm,
            description: "Managed parameter service (hierarchical, versioned)",
        },
        ProviderDefinition {
            id: Provider::SecretsManager.as_str(),
            provider: Provider::SecretsManager,
            description: "Managed secrets service (flat key/value)",
        },
        ProviderDefinition {
            id: Provider::Gpg.as_str(),
            provider: Provider::Gpg,
            description: "GPG-encrypted JSON file",
        },
        ProviderDefinition {
            id: Provider::Local.as_str(),
            provider: Provider::Local,
            description: "Plain JSON file on disk",
        },
    ]
});

/// List all providers
///
/// # Returns
/// A vector of (id, description) tuples
pub fn list_providers() -> Vec<(&'static str, &'static str)> {
    PROVIDERS.iter().map(|def| (def.id, def.description)).collect()
}

/// Parameters for building a store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    pub provider: String,
    /// Required by the managed services
    pub region: String,
    /// Store file for `gpg` (required) and `local` (optional)
    pub file_path: String,
    /// Qualifier for the local store file name
    pub stage: String,
}

impl StoreConfig {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Default::default()
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = path.into();
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = stage.into();
        self
    }
}

/// Builds stores from a `StoreConfig`
///
/// Remote providers need a `ServiceConnector`; the gpg provider uses
/// `GpgCli` unless another cipher is set.
#[derive(Default)]
pub struct StoreFactory {
    connector: Option<Arc<dyn ServiceConnector>>,
    cipher: Option<Arc<dyn Cipher>>,
}

impl StoreFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connector(mut self, connector: Arc<dyn ServiceConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn with_cipher(mut self, cipher: Arc<dyn Cipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Build the store named by `config.provider`
    pub async fn build(&self, config: &StoreConfig) -> StoreResult<Arc<dyn Store>> {
        let provider: Provider = config.provider.parse()?;

        match provider {
            Provider::Ssm => {
                let service = self.connect(ServiceKind::ParameterStore, config)?;
                Ok(Arc::new(ParameterStore::connect(service).await?))
            }
            Provider::SecretsManager => {
                let service = self.connect(ServiceKind::SecretsManager, config)?;
                Ok(Arc::new(SecretsManagerStore::connect(service).await?))
            }
            Provider::Gpg => {
                if config.file_path.is_empty() {
                    return Err(StoreError::configuration("provider `gpg` requires a file path"));
                }
                let cipher = self
                    .cipher
                    .clone()
                    .unwrap_or_else(|| Arc::new(GpgCli::new()) as Arc<dyn Cipher>);
                let options = GpgStoreOptions::new(&config.file_path).with_cipher(cipher);
                Ok(Arc::new(GpgStore::open(options)?))
            }
            Provider::Local => Ok(Arc::new(LocalStore::open(local_config(config)?)?)),
        }
    }

    fn connect(&self, kind: ServiceKind, config: &StoreConfig) -> StoreResult<Arc<dyn RemoteService>> {
        if config.region.is_empty() {
            return Err(StoreError::configuration(format!(
                "provider `{}` requires a region",
                config.provider
            )));
        }
        let connector = self.connector.as_ref().ok_or_else(|| {
            StoreError::configuration(format!(
                "no service client configured for provider `{}`",
                config.provider
            ))
        })?;
        connector.connect(kind, &config.region)
    }
}

impl std::fmt::Debug for StoreFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreFactory")
            .field("connector", &self.connector.is_some())
            .field("cipher", &self.cipher.as_ref().map(|c| c.name().to_string()))
            .finish()
    }
}

/// Build a store with the default factory (no remote connector, gpg cipher)
pub async fn create_store(config: &StoreConfig) -> StoreResult<Arc<dyn Store>> {
    StoreFactory::new().build(config).await
}

fn local_config(config: &StoreConfig) -> StoreResult<LocalStoreConfig> {
    let (directory, filename) = if config.file_path.is_empty() {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| StoreError::configuration("no data directory available for the local store"))?;
        (data_dir.join("safebox"), DEFAULT_LOCAL_FILENAME.to_string())
    } else {
        let path = Path::new(&config.file_path);
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                StoreError::configuration(format!("invalid local store path `{}`", config.file_path))
            })?;
        let directory = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        (directory, filename)
    };

    Ok(LocalStoreConfig::new(directory, filename).with_stage(&config.stage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{FixedConnector, InMemoryService};
    use crate::types::ConfigInput;
    use tempfile::tempdir;

    #[test]
    fn test_provider_parsing() {
        assert_eq!("ssm".parse::<Provider>().unwrap(), Provider::Ssm);
        assert_eq!("secrets-manager".parse::<Provider>().unwrap(), Provider::SecretsManager);
        assert_eq!("gpg".parse::<Provider>().unwrap(), Provider::Gpg);
        assert_eq!("local".parse::<Provider>().unwrap(), Provider::Local);
    }

    #[test]
    fn test_list_providers() {
        let ids: Vec<_> = list_providers().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["ssm", "secrets-manager", "gpg", "local"]);
    }

    #[tokio::test]
    async fn test_unknown_provider_names_value() {
        let err = create_store(&StoreConfig::new("vault")).await.err().unwrap();
        assert!(matches!(err, StoreError::Configuration(_)));
        assert!(err.to_string().contains("`vault`"));
    }

    #[tokio::test]
    async fn test_local_from_file_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("configs.json");
        let config = StoreConfig::new("local")
            .with_file_path(path.to_string_lossy())
            .with_stage("dev");

        let store = create_store(&config).await.unwrap();
        assert_eq!(store.name(), "local");
        store.put(ConfigInput::new("/dev/a/B", "1")).await.unwrap();
        assert!(dir.path().join("dev-configs.json").exists());
    }

    #[tokio::test]
    async fn test_gpg_requires_path() {
        let err = create_store(&StoreConfig::new("gpg")).await.err().unwrap();
        assert!(err.to_string().contains("file path"));
    }

    #[tokio::test]
    async fn test_remote_requires_region_and_connector() {
        let err = create_store(&StoreConfig::new("ssm")).await.err().unwrap();
        assert!(err.to_string().contains("region"));

        let err = create_store(&StoreConfig::new("ssm").with_region("us-east-1"))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("no service client"));
    }

    #[tokio::test]
    async fn test_remote_with_connector() {
        let service = Arc::new(InMemoryService::new("ssm", "us-east-1"));
        let factory = StoreFactory::new().with_connector(Arc::new(FixedConnector::new(service.clone())));

        let ssm = factory
            .build(&StoreConfig::new("ssm").with_region("us-east-1"))
            .await
            .unwrap();
        assert_eq!(ssm.name(), "ssm");

        let sm = factory
            .build(&StoreConfig::new("secrets-manager").with_region("us-east-1"))
            .await
            .unwrap();
        assert_eq!(sm.name(), "secrets-manager");

        service.reject_describe(true);
        assert!(factory
            .build(&StoreConfig::new("ssm").with_region("us-east-1"))
            .await
            .is_err());
    }

    #[test]
    fn test_local_config_relative_file() {
        let config = local_config(&StoreConfig::new("local").with_file_path("store.json")).unwrap();
        assert_eq!(config.directory, PathBuf::from("."));
        assert_eq!(config.filename, "store.json");
    }
}
