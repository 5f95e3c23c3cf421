//! Whole-collection record operations shared by the file-backed stores
//!
//! File stores read the full collection, apply one of these functions and
//! write the full collection back. Keeping the mutations pure makes the
//! versioning rules identical across backends.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};

use super::traits::{StoreError, StoreResult};
use crate::types::{Config, ConfigInput};

/// Apply an upsert batch to a collection
///
/// Existing records are updated in place and keep their position and
/// `created` time. New records are appended in batch order. When a name
/// appears more than once in the batch the last occurrence wins and the
/// version is bumped once.
pub fn apply_put(
    existing: &mut Vec<Config>,
    inputs: &[ConfigInput],
    now: DateTime<Utc>,
    path: &Path,
) -> StoreResult<()> {
    let mut latest: HashMap<&str, &ConfigInput> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for input in inputs {
        if latest.insert(input.name.as_str(), input).is_none() {
            order.push(input.name.as_str());
        }
    }

    for record in existing.iter_mut() {
        if let Some(input) = latest.remove(record.name.as_str()) {
            let version = record.version_number().ok_or_else(|| {
                StoreError::corrupt(
                    path,
                    format!("invalid version `{}` for {}", record.version, record.name),
                )
            })?;
            record.value = input.value.clone();
            record.config_type = input.config_type();
            record.modified = now;
            record.version = (version + 1).to_string();
        }
    }

    for name in order {
        if let Some(input) = latest.remove(name) {
            existing.push(Config::first_version(input, now));
        }
    }

    Ok(())
}

/// Remove every record named in `inputs`, returning how many were removed
pub fn apply_delete(existing: &mut Vec<Config>, inputs: &[ConfigInput]) -> usize {
    let before = existing.len();
    existing.retain(|record| !inputs.iter().any(|input| input.name == record.name));
    before - existing.len()
}

/// Records matching the requested names, in request order
pub fn select(existing: &[Config], inputs: &[ConfigInput]) -> Vec<Config> {
    inputs
        .iter()
        .filter_map(|input| existing.iter().find(|record| record.name == input.name))
        .cloned()
        .collect()
}

/// Records whose name starts with `prefix`
pub fn by_prefix(existing: &[Config], prefix: &str) -> Vec<Config> {
    existing
        .iter()
        .filter(|record| record.name.starts_with(prefix))
        .cloned()
        .collect()
}

/// Parse a serialized collection
///
/// An empty document is an empty collection; anything else that fails to
/// parse is reported as corrupt.
pub fn decode(bytes: &[u8], path: &Path) -> StoreResult<Vec<Config>> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(bytes).map_err(|e| StoreError::corrupt(path, e.to_string()))
}

/// Serialize a collection as a tab-indented JSON array
pub fn encode(records: &[Config]) -> StoreResult<Vec<u8>> {
    use serde::Serialize;

    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    records.serialize(&mut serializer)?;
    Ok(out)
}
