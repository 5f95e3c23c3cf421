//! Desired and persisted configuration records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage type of a persisted record
///
/// Serialized as `"String"` / `"SecureString"` so existing store files stay
/// readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConfigType {
    #[default]
    String,
    SecureString,
}

impl ConfigType {
    /// Storage type for an entry. Secrets are always `SecureString`.
    pub fn for_secret(secret: bool) -> Self {
        if secret {
            ConfigType::SecureString
        } else {
            ConfigType::String
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigType::String => "String",
            ConfigType::SecureString => "SecureString",
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, ConfigType::SecureString)
    }
}

impl std::fmt::Display for ConfigType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A desired-state entry, as declared by the operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigInput {
    /// Full hierarchical name, e.g. `/prod/orders/DB_PASSWORD`
    pub name: String,
    /// Desired value; empty means "must be supplied"
    #[serde(default)]
    pub value: String,
    /// Store as an opaque/encrypted value
    #[serde(default)]
    pub secret: bool,
    #[serde(default)]
    pub description: String,
}

impl ConfigInput {
    /// Create a plain entry
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            secret: false,
            description: String::new(),
        }
    }

    /// Create a secret entry
    pub fn secret(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            secret: true,
            ..Self::new(name, value)
        }
    }

    /// Create an entry that only carries a name (lookups and deletes)
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, "")
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Short name: the last `/`-delimited segment of the name
    pub fn key(&self) -> &str {
        last_segment(&self.name)
    }

    pub fn config_type(&self) -> ConfigType {
        ConfigType::for_secret(self.secret)
    }
}

/// A persisted record, owned by the store
///
/// Field names match the on-disk layout of existing store files:
/// `Name, Value, Modified, Created, Version, Type, DataType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    pub name: String,
    pub value: String,
    pub modified: DateTime<Utc>,
    pub created: DateTime<Utc>,
    /// Decimal string, `"1"` on first write, +1 on every later write
    pub version: String,
    #[serde(rename = "Type")]
    pub config_type: ConfigType,
    #[serde(default)]
    pub data_type: String,
}

impl Config {
    /// A brand-new record at version `"1"`
    pub fn first_version(input: &ConfigInput, now: DateTime<Utc>) -> Self {
        Self {
            name: input.name.clone(),
            value: input.value.clone(),
            modified: now,
            created: now,
            version: "1".to_string(),
            config_type: input.config_type(),
            data_type: String::new(),
        }
    }

    /// Short name: the last `/`-delimited segment of the name
    pub fn key(&self) -> &str {
        last_segment(&self.name)
    }

    /// Every segment except the last, joined by `/`
    pub fn path(&self) -> &str {
        match self.name.rfind('/') {
            Some(idx) => &self.name[..idx],
            None => "",
        }
    }

    /// Version as an integer, `None` if the stored string is not a number
    pub fn version_number(&self) -> Option<u64> {
        self.version.parse().ok()
    }

    /// Input that would address this record
    pub fn to_input(&self) -> ConfigInput {
        ConfigInput {
            name: self.name.clone(),
            value: self.value.clone(),
            secret: self.config_type.is_secure(),
            description: String::new(),
        }
    }
}

fn last_segment(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
