//! Client-side view of the managed parameter and secrets services

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::store::StoreResult;
use crate::types::{Config, ConfigType};

/// A value as returned by a managed service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteParameter {
    pub name: String,
    pub value: String,
    /// Service-assigned, starts at 1
    pub version: u64,
    pub secure: bool,
    pub last_modified: DateTime<Utc>,
    pub data_type: Option<String>,
}

impl RemoteParameter {
    /// Services only report the last write time, so it stands in for both
    /// timestamps.
    pub fn into_config(self) -> Config {
        Config {
            name: self.name,
            value: self.value,
            modified: self.last_modified,
            created: self.last_modified,
            version: self.version.to_string(),
            config_type: ConfigType::for_secret(self.secure),
            data_type: self.data_type.unwrap_or_default(),
        }
    }
}

/// A write request; always overwrites
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutParameter {
    pub name: String,
    pub value: String,
    pub secure: bool,
    pub description: String,
}

/// What `describe` reports about a reachable service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub service: String,
    pub region: String,
}

/// Which managed service a client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    ParameterStore,
    SecretsManager,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::ParameterStore => "ssm",
            ServiceKind::SecretsManager => "secrets-manager",
        }
    }
}

/// Operations the stores need from a managed service client
///
/// Retries, throttling and transport belong to the implementation.
#[async_trait]
pub trait RemoteService: Send + Sync {
    fn service_name(&self) -> &str;

    /// Largest number of names a single `get` accepts
    fn max_batch_size(&self) -> usize {
        10
    }

    /// Check the service is reachable and the caller is authorized
    async fn describe(&self) -> StoreResult<ServiceInfo>;

    /// Current values; unknown names are omitted
    async fn get(&self, names: &[String]) -> StoreResult<Vec<RemoteParameter>>;

    /// Create or overwrite a value, returning the new version
    async fn put(&self, parameter: PutParameter) -> StoreResult<u64>;

    /// Remove values; unknown names are ignored
    async fn delete(&self, names: &[String]) -> StoreResult<()>;

    async fn list_by_prefix(&self, prefix: &str) -> StoreResult<Vec<RemoteParameter>>;
}

/// Builds service clients for a region
pub trait ServiceConnector: Send + Sync {
    fn connect(&self, kind: ServiceKind, region: &str) -> StoreResult<Arc<dyn RemoteService>>;
}

/// Connector that hands out one pre-built client for every request
pub struct FixedConnector {
    service: Arc<dyn RemoteService>,
}

impl FixedConnector {
    pub fn new(service: Arc<dyn RemoteService>) -> Self {
        Self { service }
    }
}

impl ServiceConnector for FixedConnector {
    fn connect(&self, _kind: ServiceKind, _region: &str) -> StoreResult<Arc<dyn RemoteService>> {
        Ok(Arc::clone(&self.service))
    }
}

impl std::fmt::Debug for FixedConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedConnector")
            .field("service", &self.service.service_name())
            .finish()
    }
}
