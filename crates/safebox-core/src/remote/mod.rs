//! Stores backed by managed remote services
//!
//! The services themselves are reached through a `RemoteService` client;
//! this module only adapts them to the `Store` contract.

mod traits;
mod memory;
mod parameter_store;
mod secrets_manager;

pub use traits::{
    FixedConnector, PutParameter, RemoteParameter, RemoteService, ServiceConnector, ServiceInfo,
    ServiceKind,
};
pub use memory::InMemoryService;
pub use parameter_store::ParameterStore;
pub use secrets_manager::SecretsManagerStore;

use crate::store::StoreResult;
use crate::types::{Config, ConfigInput};

/// Collapse a batch to one entry per name, keeping the last occurrence
pub(crate) fn last_per_name(inputs: Vec<ConfigInput>) -> Vec<ConfigInput> {
    let mut out: Vec<ConfigInput> = Vec::with_capacity(inputs.len());
    for input in inputs {
        match out.iter_mut().find(|existing| existing.name == input.name) {
            Some(existing) => *existing = input,
            None => out.push(input),
        }
    }
    out
}

/// Fetch names in service-sized chunks, preserving request order
pub(crate) async fn get_chunked(
    service: &dyn RemoteService,
    inputs: &[ConfigInput],
) -> StoreResult<Vec<Config>> {
    let names: Vec<String> = inputs.iter().map(|i| i.name.clone()).collect();
    let mut found = Vec::new();
    for chunk in names.chunks(service.max_batch_size().max(1)) {
        found.extend(service.get(chunk).await?);
    }

    Ok(names
        .iter()
        .filter_map(|name| found.iter().position(|p| &p.name == name))
        .map(|idx| found[idx].clone().into_config())
        .collect())
}
