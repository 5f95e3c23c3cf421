//! Deploy: reconcile declared entries with a store
//!
//! - `DeployPlan`: desired configs, secrets to prompt for, tracked names
//! - `Deployer`: the reconciliation engine
//! - `Prompter` / `FileGenerator`: collaborators injected into the engine

mod engine;
mod generate;
mod plan;
mod prompt;
mod report;

pub use engine::{DeployError, DeployResult, Deployer};
pub use generate::FileGenerator;
pub use plan::{DeployPlan, GenerateTarget, PromptMode};
pub use prompt::{LinePrompter, PromptError, PromptRequest, Prompter};
pub use report::{DeployReport, PartialFailure};
