//! Reconciliation engine
//!
//! Compares a `DeployPlan` with what the store holds, writes the difference
//! in one `put_many`, then optionally prunes orphans and renders files.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;

use super::generate::FileGenerator;
use super::plan::{DeployPlan, PromptMode};
use super::prompt::{PromptError, PromptRequest, Prompter};
use super::report::{DeployReport, PartialFailure};
use crate::logging::{NoOpLogger, SharedLogger};
use crate::store::{Store, StoreError};
use crate::types::{Config, ConfigInput};
use crate::{log_debug, log_info, log_warn};

/// Errors that abort a deploy
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("invalid deploy plan: {0}")]
    InvalidPlan(String),

    #[error("failed to read existing configs")]
    ReadExisting(#[source] StoreError),

    #[error(
        "{} secret value(s) missing ({}); re-run with prompting enabled",
        .names.len(),
        .names.join(", ")
    )]
    MissingValues { names: Vec<String> },

    #[error("failed to obtain a value for {name}")]
    Prompt {
        name: String,
        #[source]
        source: PromptError,
    },

    #[error("failed to write configs")]
    Write(#[source] StoreError),
}

pub type DeployResult<T> = Result<T, DeployError>;

/// Runs deploy plans against one store
///
/// # Example
///
/// ```rust,ignore
/// let deployer = Deployer::new(store)
///     .with_prompter(Arc::new(LinePrompter::stdio()))
///     .with_logger(Arc::new(ConsoleLogger::new()));
/// let report = deployer.deploy(&plan).await?;
/// println!("{}", report.summary());
/// ```
pub struct Deployer {
    store: Arc<dyn Store>,
    prompter: Option<Arc<dyn Prompter>>,
    generator: Option<Arc<dyn FileGenerator>>,
    logger: SharedLogger,
}

impl Deployer {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            prompter: None,
            generator: None,
            logger: Arc::new(NoOpLogger),
        }
    }

    pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = Some(prompter);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn FileGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Reconcile the store with `plan`
    ///
    /// Nothing is written unless every value could be determined. A failed
    /// write stops before orphan removal; failures after the write land in
    /// `DeployReport::failures` and are not rolled back.
    pub async fn deploy(&self, plan: &DeployPlan) -> DeployResult<DeployReport> {
        plan.validate()?;

        let tracked = plan.tracked();
        let existing = self
            .store
            .get_many(&tracked)
            .await
            .map_err(DeployError::ReadExisting)?;
        let current: HashMap<&str, &Config> =
            existing.iter().map(|c| (c.name.as_str(), c)).collect();

        let missing: Vec<&ConfigInput> = plan
            .secrets
            .iter()
            .filter(|s| !current.contains_key(s.name.as_str()))
            .collect();
        if !missing.is_empty() && plan.prompt == PromptMode::Off {
            return Err(DeployError::MissingValues {
                names: missing.iter().map(|s| s.name.clone()).collect(),
            });
        }

        let mut queue = Vec::new();
        match plan.prompt {
            PromptMode::Off => {}
            PromptMode::Missing => {
                for secret in missing {
                    let value = if secret.value.is_empty() {
                        self.ask(secret, "")?
                    } else {
                        secret.value.clone()
                    };
                    queue.push(secret.clone().with_value(value));
                }
            }
            PromptMode::All => {
                for secret in &plan.secrets {
                    let stored = current.get(secret.name.as_str()).map(|c| c.value.as_str());
                    let answer = self.ask(secret, stored.unwrap_or(secret.value.as_str()))?;
                    if stored != Some(answer.as_str()) {
                        queue.push(secret.clone().with_value(answer));
                    }
                }
            }
        }

        for config in &plan.configs {
            let changed = current
                .get(config.name.as_str())
                .map_or(true, |c| c.value != config.value);
            if changed {
                queue.push(config.clone());
            }
        }

        let mut report = DeployReport::default();
        if queue.is_empty() {
            log_debug!(self.logger, "nothing to write");
        } else {
            report.written = queue.len();
            report.written_names = queue.iter().map(|i| i.name.clone()).collect();
            self.store.put_many(queue).await.map_err(DeployError::Write)?;
            log_info!(self.logger, "wrote {} configs to {}", report.written, self.store.name());
        }

        if plan.remove_orphans {
            self.remove_orphans(plan, &tracked, &mut report).await;
        }

        if !plan.generate.is_empty() {
            self.generate(plan, &tracked, &mut report).await;
        }

        Ok(report)
    }

    fn ask(&self, input: &ConfigInput, default: &str) -> DeployResult<String> {
        let prompter = self.prompter.as_ref().ok_or_else(|| DeployError::Prompt {
            name: input.name.clone(),
            source: PromptError::Unavailable,
        })?;

        let label = if input.description.is_empty() {
            input.key().to_string()
        } else {
            format!("{} ({})", input.key(), input.description)
        };
        let request = PromptRequest {
            name: &input.name,
            label: &label,
            default,
        };

        prompter.prompt(&request).map_err(|source| DeployError::Prompt {
            name: input.name.clone(),
            source,
        })
    }

    async fn remove_orphans(&self, plan: &DeployPlan, tracked: &[ConfigInput], report: &mut DeployReport) {
        let stored = match self.store.get_by_path(&plan.prefix).await {
            Ok(stored) => stored,
            Err(e) => {
                log_warn!(self.logger, "could not list {}: {}", plan.prefix, e);
                report.failures.push(PartialFailure::new("remove orphans", e));
                return;
            }
        };

        let keep: HashSet<&str> = tracked.iter().map(|i| i.name.as_str()).collect();
        let orphans: Vec<ConfigInput> = stored
            .iter()
            .filter(|c| !keep.contains(c.name.as_str()))
            .map(|c| ConfigInput::named(&c.name))
            .collect();
        if orphans.is_empty() {
            return;
        }

        match self.store.delete_many(&orphans).await {
            Ok(()) => {
                log_info!(self.logger, "removed {} orphans under {}", orphans.len(), plan.prefix);
                report.orphans_removed = orphans.into_iter().map(|i| i.name).collect();
            }
            Err(e) => {
                log_warn!(self.logger, "orphan removal failed: {}", e);
                report.failures.push(PartialFailure::new("remove orphans", e));
            }
        }
    }

    async fn generate(&self, plan: &DeployPlan, tracked: &[ConfigInput], report: &mut DeployReport) {
        let Some(generator) = self.generator.as_ref() else {
            for target in &plan.generate {
                log_warn!(self.logger, "no generator configured for {}", target.path.display());
                report.failures.push(PartialFailure::new(
                    format!("generate {}", target.path.display()),
                    "no file generator configured",
                ));
            }
            return;
        };

        let configs = match self.store.get_many(tracked).await {
            Ok(configs) => configs,
            Err(e) => {
                log_warn!(self.logger, "could not re-read configs for generation: {}", e);
                report.failures.push(PartialFailure::new("generate", e));
                return;
            }
        };

        for target in &plan.generate {
            match generator.generate(&configs, target) {
                Ok(()) => {
                    log_info!(self.logger, "generated {}", target.path.display());
                    report.generated.push(target.path.clone());
                }
                Err(e) => {
                    log_warn!(self.logger, "failed to generate {}: {}", target.path.display(), e);
                    report
                        .failures
                        .push(PartialFailure::new(format!("generate {}", target.path.display()), e));
                }
            }
        }
    }
}

impl std::fmt::Debug for Deployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployer")
            .field("store", &self.store.name())
            .field("prompter", &self.prompter.is_some())
            .field("generator", &self.generator.is_some())
            .finish()
    }
}
