//! Declaration file (`safebox.yml`)
//!
//! A manifest names the service, the store to deploy into and the entries
//! to keep there, per stage:
//!
//! ```yaml
//! service: orders
//! provider: ssm
//! region: ap-southeast-2
//! config:
//!   defaults: { DB_NAME: orders }
//!   prod:     { DB_NAME: orders-prod }
//!   shared:   { SHARED_BUCKET: assets }
//! secret:
//!   defaults: { API_KEY: "key for the payments api" }
//! generate:
//!   - { type: dotenv, path: .env }
//! ```
//!
//! `resolve(stage)` turns it into a `DeployPlan` and the `StoreConfig` for
//! the factory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deploy::{DeployPlan, GenerateTarget};
use crate::store::StoreConfig;
use crate::types::ConfigInput;

/// Conventional manifest file name
pub const DEFAULT_MANIFEST: &str = "safebox.yml";

const DEFAULTS_SECTION: &str = "defaults";
const SHARED_SECTION: &str = "shared";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

pub type ManifestResult<T> = Result<T, ManifestError>;

/// Entries per section: `defaults`, `shared`, or a stage name
pub type Sections = BTreeMap<String, BTreeMap<String, String>>;

/// Parsed `safebox.yml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub region: String,
    /// Store file for file-backed providers; may use templates
    #[serde(default)]
    pub filepath: String,
    /// Orphan-removal scope; defaults to `/{stage}/{service}/`
    #[serde(default)]
    pub prefix: String,
    /// Key → value
    #[serde(default)]
    pub config: Sections,
    /// Key → description; values are supplied at deploy time
    #[serde(default)]
    pub secret: Sections,
    #[serde(default)]
    pub generate: Vec<GenerateTarget>,
}

/// A manifest bound to one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedManifest {
    pub stage: String,
    pub service: String,
    pub plan: DeployPlan,
    pub store_config: StoreConfig,
}

impl FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_yaml::from_str(s)?)
    }
}

impl Manifest {
    pub fn load(path: impl AsRef<Path>) -> ManifestResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }

    /// Bind to `stage`: expand templates, merge sections, build names
    pub fn resolve(&self, stage: &str) -> ManifestResult<ResolvedManifest> {
        if self.service.is_empty() {
            return Err(ManifestError::MissingField("service"));
        }
        if self.provider.is_empty() {
            return Err(ManifestError::MissingField("provider"));
        }
        if stage.is_empty() {
            return Err(ManifestError::MissingField("stage"));
        }
        if stage == DEFAULTS_SECTION || stage == SHARED_SECTION || stage.contains('/') {
            return Err(ManifestError::InvalidValue {
                field: "stage",
                reason: format!("`{}` cannot be used as a stage name", stage),
            });
        }

        let vars = Vars {
            stage,
            service: &self.service,
            region: &self.region,
        };

        let prefix = if self.prefix.is_empty() {
            format!("/{}/{}/", stage, self.service)
        } else {
            vars.render(&self.prefix)
        };
        let shared_prefix = format!("/{}/{}/", stage, SHARED_SECTION);

        let mut configs = Vec::new();
        for (key, value) in merged(&self.config, stage) {
            configs.push(ConfigInput::new(format!("{}{}", prefix, key), value));
        }
        for (key, value) in section(&self.config, SHARED_SECTION) {
            configs.push(ConfigInput::new(format!("{}{}", shared_prefix, key), value));
        }

        let mut secrets = Vec::new();
        for (key, description) in merged(&self.secret, stage) {
            secrets.push(ConfigInput::secret(format!("{}{}", prefix, key), "").with_description(description));
        }
        for (key, description) in section(&self.secret, SHARED_SECTION) {
            secrets.push(
                ConfigInput::secret(format!("{}{}", shared_prefix, key), "").with_description(description),
            );
        }

        let all: Vec<ConfigInput> = configs.iter().chain(secrets.iter()).cloned().collect();
        let generate = self
            .generate
            .iter()
            .map(|t| GenerateTarget::new(t.format, vars.render(&t.path.to_string_lossy())))
            .collect();

        let plan = DeployPlan::new(configs, secrets)
            .with_tracked(all)
            .with_prefix(prefix)
            .with_generate(generate);

        let store_config = StoreConfig::new(&self.provider)
            .with_region(&self.region)
            .with_file_path(vars.render(&self.filepath))
            .with_stage(stage);

        Ok(ResolvedManifest {
            stage: stage.to_string(),
            service: self.service.clone(),
            plan,
            store_config,
        })
    }
}

struct Vars<'a> {
    stage: &'a str,
    service: &'a str,
    region: &'a str,
}

impl Vars<'_> {
    fn render(&self, template: &str) -> String {
        template
            .replace("{{.stage}}", self.stage)
            .replace("{{.service}}", self.service)
            .replace("{{.region}}", self.region)
    }
}

fn section(sections: &Sections, name: &str) -> BTreeMap<String, String> {
    sections.get(name).cloned().unwrap_or_default()
}

/// `defaults` overlaid with the stage's own section
fn merged(sections: &Sections, stage: &str) -> BTreeMap<String, String> {
    let mut entries = section(sections, DEFAULTS_SECTION);
    entries.extend(section(sections, stage));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::PromptMode;
    use crate::export::ExportFormat;
    use tempfile::tempdir;

    const MANIFEST: &str = r#"
service: orders
provider: local
region: ap-southeast-2
filepath: ".safebox/{{.stage}}.json"
config:
  defaults:
    DB_NAME: orders
    LOG_LEVEL: info
  prod:
    DB_NAME: orders-prod
  shared:
    BUCKET: assets
secret:
  defaults:
    API_KEY: key for the payments api
  shared:
    SENTRY_DSN: sentry dsn
generate:
  - type: dotenv
    path: "{{.stage}}.env"
"#;

    fn names(inputs: &[ConfigInput]) -> Vec<&str> {
        inputs.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_resolve_prod() {
        let manifest: Manifest = MANIFEST.parse().unwrap();
        let resolved = manifest.resolve("prod").unwrap();
        let plan = &resolved.plan;

        assert_eq!(plan.prefix, "/prod/orders/");
        assert_eq!(
            names(&plan.configs),
            vec!["/prod/orders/DB_NAME", "/prod/orders/LOG_LEVEL", "/prod/shared/BUCKET"]
        );
        assert_eq!(plan.configs[0].value, "orders-prod");
        assert_eq!(plan.configs[1].value, "info");

        assert_eq!(names(&plan.secrets), vec!["/prod/orders/API_KEY", "/prod/shared/SENTRY_DSN"]);
        assert!(plan.secrets.iter().all(|s| s.secret && s.value.is_empty()));
        assert_eq!(plan.secrets[0].description, "key for the payments api");

        assert_eq!(plan.all.len(), 5);
        assert_eq!(plan.prompt, PromptMode::Off);
        assert!(!plan.remove_orphans);
        assert_eq!(plan.generate, vec![GenerateTarget::new(ExportFormat::Dotenv, "prod.env")]);

        assert_eq!(
            resolved.store_config,
            StoreConfig::new("local")
                .with_region("ap-southeast-2")
                .with_file_path(".safebox/prod.json")
                .with_stage("prod")
        );
    }

    #[test]
    fn test_stage_without_section_uses_defaults() {
        let manifest: Manifest = MANIFEST.parse().unwrap();
        let plan = manifest.resolve("dev").unwrap().plan;
        assert_eq!(plan.configs[0].name, "/dev/orders/DB_NAME");
        assert_eq!(plan.configs[0].value, "orders");
    }

    #[test]
    fn test_custom_prefix_template() {
        let manifest = Manifest {
            service: "orders".into(),
            provider: "ssm".into(),
            region: "us-east-1".into(),
            prefix: "/{{.region}}/{{.stage}}/{{.service}}/".into(),
            ..Default::default()
        };
        let resolved = manifest.resolve("test").unwrap();
        assert_eq!(resolved.plan.prefix, "/us-east-1/test/orders/");
    }

    #[test]
    fn test_missing_fields() {
        let manifest: Manifest = "provider: ssm\n".parse().unwrap();
        assert!(matches!(manifest.resolve("dev"), Err(ManifestError::MissingField("service"))));

        let manifest: Manifest = "service: orders\n".parse().unwrap();
        assert!(matches!(manifest.resolve("dev"), Err(ManifestError::MissingField("provider"))));

        let manifest: Manifest = MANIFEST.parse().unwrap();
        assert!(matches!(manifest.resolve(""), Err(ManifestError::MissingField("stage"))));
        assert!(matches!(manifest.resolve("shared"), Err(ManifestError::InvalidValue { .. })));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!("service: [".parse::<Manifest>(), Err(ManifestError::Parse(_))));
    }

    #[test]
    fn test_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_MANIFEST);
        std::fs::write(&path, MANIFEST).unwrap();
        assert_eq!(Manifest::load(&path).unwrap().service, "orders");

        let err = Manifest::load(dir.path().join("missing.yml")).unwrap_err();
        assert!(err.to_string().contains("missing.yml"));
    }
}
