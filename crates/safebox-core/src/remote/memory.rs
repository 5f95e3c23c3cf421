//! In-memory managed service

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::traits::{PutParameter, RemoteParameter, RemoteService, ServiceInfo};
use crate::store::{StoreError, StoreResult};

/// A managed service that lives in memory
///
/// Versions are assigned server-side, like the real services. Counts writes
/// so tests can assert that a deploy was a no-op.
#[derive(Debug)]
pub struct InMemoryService {
    name: String,
    region: String,
    parameters: Mutex<BTreeMap<String, RemoteParameter>>,
    reject_describe: AtomicBool,
    puts: AtomicUsize,
}

impl InMemoryService {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            parameters: Mutex::new(BTreeMap::new()),
            reject_describe: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
        }
    }

    /// Make `describe` fail, as a service with bad credentials would
    pub fn reject_describe(&self, reject: bool) {
        self.reject_describe.store(reject, Ordering::SeqCst);
    }

    /// Number of successful `put` calls so far
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.parameters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RemoteService for InMemoryService {
    fn service_name(&self) -> &str {
        &self.name
    }

    async fn describe(&self) -> StoreResult<ServiceInfo> {
        if self.reject_describe.load(Ordering::SeqCst) {
            return Err(StoreError::remote(&self.name, "UnrecognizedClientException: invalid security token"));
        }
        Ok(ServiceInfo {
            service: self.name.clone(),
            region: self.region.clone(),
        })
    }

    async fn get(&self, names: &[String]) -> StoreResult<Vec<RemoteParameter>> {
        if names.len() > self.max_batch_size() {
            return Err(StoreError::remote(
                &self.name,
                format!("too many names in one request: {}", names.len()),
            ));
        }
        let parameters = self.parameters.lock();
        Ok(names.iter().filter_map(|n| parameters.get(n).cloned()).collect())
    }

    async fn put(&self, parameter: PutParameter) -> StoreResult<u64> {
        if parameter.name.is_empty() {
            return Err(StoreError::remote(&self.name, "ValidationException: name must not be empty"));
        }
        let mut parameters = self.parameters.lock();
        let version = parameters.get(&parameter.name).map(|p| p.version + 1).unwrap_or(1);
        parameters.insert(
            parameter.name.clone(),
            RemoteParameter {
                name: parameter.name,
                value: parameter.value,
                version,
                secure: parameter.secure,
                last_modified: Utc::now(),
                data_type: Some("text".to_string()),
            },
        );
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(version)
    }

    async fn delete(&self, names: &[String]) -> StoreResult<()> {
        let mut parameters = self.parameters.lock();
        for name in names {
            parameters.remove(name);
        }
        Ok(())
    }

    async fn list_by_prefix(&self, prefix: &str) -> StoreResult<Vec<RemoteParameter>> {
        let parameters = self.parameters.lock();
        Ok(parameters
            .values()
            .filter(|p| p.name.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(name: &str, value: &str) -> PutParameter {
        PutParameter {
            name: name.into(),
            value: value.into(),
            secure: false,
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_server_side_versions() {
        let service = InMemoryService::new("ssm", "us-east-1");
        assert_eq!(service.put(put("/a", "1")).await.unwrap(), 1);
        assert_eq!(service.put(put("/a", "2")).await.unwrap(), 2);
        assert_eq!(service.put_count(), 2);
    }

    #[tokio::test]
    async fn test_batch_limit() {
        let service = InMemoryService::new("ssm", "us-east-1");
        let names: Vec<String> = (0..11).map(|i| format!("/n{}", i)).collect();
        assert!(service.get(&names).await.is_err());
        assert!(service.get(&names[..10]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_describe_rejection() {
        let service = InMemoryService::new("ssm", "us-east-1");
        assert_eq!(service.describe().await.unwrap().region, "us-east-1");

        service.reject_describe(true);
        assert!(matches!(service.describe().await, Err(StoreError::Remote { .. })));
    }
}
