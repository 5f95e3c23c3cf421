//! Managed parameter service store (hierarchical, versioned)

use std::sync::Arc;

use async_trait::async_trait;

use super::traits::{PutParameter, RemoteService};
use super::{get_chunked, last_per_name};
use crate::logging::file_logger as log;
use crate::store::{Store, StoreResult};
use crate::types::{Config, ConfigInput};

/// Store backed by a hierarchical parameter service
///
/// Versions are assigned by the service. The service has no batch write,
/// so `put_many` writes one parameter at a time and stops at the first
/// rejection; names written before it stay written.
pub struct ParameterStore {
    service: Arc<dyn RemoteService>,
}

impl ParameterStore {
    /// Wrap a client, failing now if the service cannot be reached
    pub async fn connect(service: Arc<dyn RemoteService>) -> StoreResult<Self> {
        let info = service.describe().await?;
        log::debug(
            "ParameterStore",
            &format!("connected to {} in {}", info.service, info.region),
        );
        Ok(Self { service })
    }
}

impl std::fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStore")
            .field("service", &self.service.service_name())
            .finish()
    }
}

#[async_trait]
impl Store for ParameterStore {
    fn name(&self) -> &str {
        "ssm"
    }

    async fn put_many(&self, inputs: Vec<ConfigInput>) -> StoreResult<()> {
        for (written, input) in last_per_name(inputs).into_iter().enumerate() {
            let name = input.name.clone();
            let version = self
                .service
                .put(PutParameter {
                    name: input.name,
                    value: input.value,
                    secure: input.secret,
                    description: input.description,
                })
                .await
                .map_err(|e| {
                    log::error(
                        "ParameterStore",
                        &format!("put {} failed after {} writes: {}", name, written, e),
                    );
                    e
                })?;
            log::debug("ParameterStore", &format!("put {} -> version {}", name, version));
        }
        Ok(())
    }

    async fn get_many(&self, inputs: &[ConfigInput]) -> StoreResult<Vec<Config>> {
        get_chunked(self.service.as_ref(), inputs).await
    }

    async fn get_by_path(&self, prefix: &str) -> StoreResult<Vec<Config>> {
        let parameters = self.service.list_by_prefix(prefix).await?;
        Ok(parameters.into_iter().map(|p| p.into_config()).collect())
    }

    async fn delete_many(&self, inputs: &[ConfigInput]) -> StoreResult<()> {
        if inputs.is_empty() {
            return Ok(());
        }
        let names: Vec<String> = inputs.iter().map(|i| i.name.clone()).collect();
        for chunk in names.chunks(self.service.max_batch_size().max(1)) {
            self.service.delete(chunk).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::InMemoryService;
    use crate::store::StoreError;

    async fn store() -> (Arc<InMemoryService>, ParameterStore) {
        let service = Arc::new(InMemoryService::new("ssm", "ap-southeast-2"));
        let store = ParameterStore::connect(service.clone()).await.unwrap();
        (service, store)
    }

    #[tokio::test]
    async fn test_connect_fails_fast() {
        let service = Arc::new(InMemoryService::new("ssm", "ap-southeast-2"));
        service.reject_describe(true);
        assert!(matches!(
            ParameterStore::connect(service).await,
            Err(StoreError::Remote { .. })
        ));
    }

    #[tokio::test]
    async fn test_versions_and_types() {
        let (_, store) = store().await;
        store.put(ConfigInput::secret("/prod/orders/TOKEN", "a")).await.unwrap();
        store.put(ConfigInput::secret("/prod/orders/TOKEN", "b")).await.unwrap();

        let found = store.get(&ConfigInput::named("/prod/orders/TOKEN")).await.unwrap().unwrap();
        assert_eq!(found.version, "2");
        assert_eq!(found.value, "b");
        assert_eq!(found.config_type.as_str(), "SecureString");
        assert_eq!(found.data_type, "text");
    }

    #[tokio::test]
    async fn test_get_many_spans_batches() {
        let (_, store) = store().await;
        let inputs: Vec<ConfigInput> = (0..25)
            .map(|i| ConfigInput::new(format!("/dev/svc/K{:02}", i), "v"))
            .collect();
        store.put_many(inputs.clone()).await.unwrap();

        let mut lookup = inputs.clone();
        lookup.push(ConfigInput::named("/dev/svc/MISSING"));
        let found = store.get_many(&lookup).await.unwrap();
        assert_eq!(found.len(), 25);
        assert_eq!(found[0].name, "/dev/svc/K00");
        assert_eq!(found[24].name, "/dev/svc/K24");
    }

    #[tokio::test]
    async fn test_duplicate_names_written_once() {
        let (service, store) = store().await;
        store
            .put_many(vec![ConfigInput::new("/a", "1"), ConfigInput::new("/a", "2")])
            .await
            .unwrap();
        assert_eq!(service.put_count(), 1);
    }

    #[tokio::test]
    async fn test_path_and_delete() {
        let (_, store) = store().await;
        store
            .put_many(vec![ConfigInput::new("a/b", "1"), ConfigInput::new("a/c", "1"), ConfigInput::new("b/a", "1")])
            .await
            .unwrap();

        assert_eq!(store.get_by_path("a/").await.unwrap().len(), 2);
        store.delete_many(&[ConfigInput::named("a/b"), ConfigInput::named("a/zzz")]).await.unwrap();
        assert_eq!(store.get_by_path("a/").await.unwrap().len(), 1);
    }
}
