//! Desired state handed to the deploy engine

use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::engine::DeployError;
use crate::export::ExportFormat;
use crate::types::ConfigInput;

/// When the engine asks the operator for secret values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptMode {
    /// Never prompt; missing secrets fail the deploy
    #[default]
    Off,
    /// Prompt for secrets absent from the store
    Missing,
    /// Prompt for every secret, offering the stored value as default
    All,
}

impl PromptMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptMode::Off => "off",
            PromptMode::Missing => "missing",
            PromptMode::All => "all",
        }
    }
}

impl FromStr for PromptMode {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "off" => Ok(PromptMode::Off),
            "missing" => Ok(PromptMode::Missing),
            "all" => Ok(PromptMode::All),
            _ => Err(DeployError::InvalidPlan(
                "value for prompt must be \"all\" or \"missing\"".to_string(),
            )),
        }
    }
}

impl std::fmt::Display for PromptMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file to render from the deployed values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateTarget {
    #[serde(rename = "type")]
    pub format: ExportFormat,
    pub path: PathBuf,
}

impl GenerateTarget {
    pub fn new(format: ExportFormat, path: impl Into<PathBuf>) -> Self {
        Self {
            format,
            path: path.into(),
        }
    }
}

/// Everything the engine needs to reconcile one stage
///
/// `configs` carry their desired values. `secrets` usually carry none and
/// are filled in by prompting. `all` is the tracked-name set used for the
/// initial read and for orphan detection; it is widened with `configs` and
/// `secrets` automatically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployPlan {
    pub configs: Vec<ConfigInput>,
    pub secrets: Vec<ConfigInput>,
    pub all: Vec<ConfigInput>,
    /// Scope for orphan removal, e.g. `/prod/orders/`
    pub prefix: String,
    pub prompt: PromptMode,
    pub remove_orphans: bool,
    pub generate: Vec<GenerateTarget>,
}

impl DeployPlan {
    pub fn new(configs: Vec<ConfigInput>, secrets: Vec<ConfigInput>) -> Self {
        Self {
            configs,
            secrets,
            ..Default::default()
        }
    }

    /// Track additional names (e.g. shared entries deployed elsewhere)
    pub fn with_tracked(mut self, all: Vec<ConfigInput>) -> Self {
        self.all = all;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_prompt(mut self, prompt: PromptMode) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn remove_orphans(mut self, remove: bool) -> Self {
        self.remove_orphans = remove;
        self
    }

    pub fn with_generate(mut self, targets: Vec<GenerateTarget>) -> Self {
        self.generate = targets;
        self
    }

    /// Every tracked name, first occurrence wins, in declaration order
    pub fn tracked(&self) -> Vec<ConfigInput> {
        let mut seen = HashSet::new();
        self.all
            .iter()
            .chain(self.configs.iter())
            .chain(self.secrets.iter())
            .filter(|input| seen.insert(input.name.as_str()))
            .cloned()
            .collect()
    }

    pub(crate) fn validate(&self) -> Result<(), DeployError> {
        if self.remove_orphans && self.prefix.is_empty() {
            return Err(DeployError::InvalidPlan(
                "orphan removal needs a non-empty prefix".to_string(),
            ));
        }
        let unnamed = self
            .all
            .iter()
            .chain(self.configs.iter())
            .chain(self.secrets.iter())
            .any(|input| input.name.is_empty());
        if unnamed {
            return Err(DeployError::InvalidPlan("entry with an empty name".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mode_parsing() {
        assert_eq!("".parse::<PromptMode>().unwrap(), PromptMode::Off);
        assert_eq!("off".parse::<PromptMode>().unwrap(), PromptMode::Off);
        assert_eq!("missing".parse::<PromptMode>().unwrap(), PromptMode::Missing);
        assert_eq!("all".parse::<PromptMode>().unwrap(), PromptMode::All);

        let err = "sometimes".parse::<PromptMode>().unwrap_err();
        assert!(err.to_string().contains("value for prompt must be \"all\" or \"missing\""));
    }

    #[test]
    fn test_tracked_dedupes() {
        let plan = DeployPlan::new(
            vec![ConfigInput::new("/dev/svc/A", "1")],
            vec![ConfigInput::secret("/dev/svc/S", "")],
        )
        .with_tracked(vec![
            ConfigInput::named("/dev/svc/A"),
            ConfigInput::named("/dev/shared/X"),
        ]);

        let names: Vec<_> = plan.tracked().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["/dev/svc/A", "/dev/shared/X", "/dev/svc/S"]);
    }

    #[test]
    fn test_orphan_removal_needs_prefix() {
        let plan = DeployPlan::default().remove_orphans(true);
        assert!(matches!(plan.validate(), Err(DeployError::InvalidPlan(_))));
        assert!(plan.with_prefix("/dev/svc/").validate().is_ok());
    }

    #[test]
    fn test_generate_target_yaml_shape() {
        let target: GenerateTarget = serde_yaml::from_str("type: dotenv\npath: .env\n").unwrap();
        assert_eq!(target, GenerateTarget::new(ExportFormat::Dotenv, ".env"));
    }
}
