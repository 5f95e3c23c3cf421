//! Deploy outcome

use std::error::Error;
use std::path::PathBuf;

use thiserror::Error;

/// A secondary step that failed after the main write succeeded
#[derive(Error, Debug)]
#[error("{step} failed: {source}")]
pub struct PartialFailure {
    pub step: String,
    #[source]
    pub source: Box<dyn Error + Send + Sync>,
}

impl PartialFailure {
    pub fn new(step: impl Into<String>, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            step: step.into(),
            source: source.into(),
        }
    }
}

/// What a deploy changed
#[derive(Debug, Default)]
pub struct DeployReport {
    /// Number of entries sent in the single write
    pub written: usize,
    pub written_names: Vec<String>,
    pub orphans_removed: Vec<String>,
    pub generated: Vec<PathBuf>,
    pub failures: Vec<PartialFailure>,
}

impl DeployReport {
    pub fn summary(&self) -> String {
        format!("new configs = {}", self.written)
    }

    /// No secondary step failed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let report = DeployReport {
            written: 3,
            ..Default::default()
        };
        assert_eq!(report.summary(), "new configs = 3");
        assert!(report.is_clean());
    }

    #[test]
    fn test_partial_failure_keeps_cause() {
        let failure = PartialFailure::new("remove orphans", "access denied");
        assert_eq!(failure.to_string(), "remove orphans failed: access denied");
        assert_eq!(failure.source().unwrap().to_string(), "access denied");
    }
}
