//! Managed secrets service store (flat key/value)

use std::sync::Arc;

use async_trait::async_trait;

use super::traits::{PutParameter, RemoteService};
use super::{get_chunked, last_per_name};
use crate::logging::file_logger as log;
use crate::store::{Store, StoreResult};
use crate::types::{Config, ConfigInput};

/// Store backed by a flat secrets service
///
/// Names are opaque to the service; prefix scans are done with its name
/// filter. Deletes skip the recovery window, one secret per call, because
/// the service has no batch delete.
pub struct SecretsManagerStore {
    service: Arc<dyn RemoteService>,
}

impl SecretsManagerStore {
    /// Wrap a client, failing now if the service cannot be reached
    pub async fn connect(service: Arc<dyn RemoteService>) -> StoreResult<Self> {
        let info = service.describe().await?;
        log::debug(
            "SecretsManagerStore",
            &format!("connected to {} in {}", info.service, info.region),
        );
        Ok(Self { service })
    }
}

impl std::fmt::Debug for SecretsManagerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsManagerStore")
            .field("service", &self.service.service_name())
            .finish()
    }
}

#[async_trait]
impl Store for SecretsManagerStore {
    fn name(&self) -> &str {
        "secrets-manager"
    }

    async fn put_many(&self, inputs: Vec<ConfigInput>) -> StoreResult<()> {
        for input in last_per_name(inputs) {
            let description = if input.description.is_empty() {
                input.key().to_string()
            } else {
                input.description.clone()
            };
            self.service
                .put(PutParameter {
                    name: input.name,
                    value: input.value,
                    secure: input.secret,
                    description,
                })
                .await?;
        }
        Ok(())
    }

    async fn get_many(&self, inputs: &[ConfigInput]) -> StoreResult<Vec<Config>> {
        get_chunked(self.service.as_ref(), inputs).await
    }

    async fn get_by_path(&self, prefix: &str) -> StoreResult<Vec<Config>> {
        let secrets = self.service.list_by_prefix(prefix).await?;
        Ok(secrets.into_iter().map(|s| s.into_config()).collect())
    }

    async fn delete_many(&self, inputs: &[ConfigInput]) -> StoreResult<()> {
        for input in inputs {
            self.service.delete(std::slice::from_ref(&input.name)).await?;
            log::debug("SecretsManagerStore", &format!("deleted {} without recovery", input.name));
        }
        Ok(())
    }
}
