//! Secondary file generation collaborator

use std::error::Error;

use super::plan::GenerateTarget;
use crate::types::Config;

/// Renders deployed values into a file
///
/// Failures are reported by the engine and never abort a deploy.
pub trait FileGenerator: Send + Sync {
    fn generate(
        &self,
        configs: &[Config],
        target: &GenerateTarget,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}
