//! Console logger implementation

use super::traits::Logger;

/// A logger that prints deploy output to the console
///
/// Info goes to stdout so summaries can be piped; everything else goes to
/// stderr.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    prefix: String,
    verbose: bool,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self {
            prefix: "[safebox]".to_string(),
            verbose: false,
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::new()
        }
    }

    /// Also print debug messages
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Logger for ConsoleLogger {
    fn debug(&self, message: &str) {
        if self.verbose {
            eprintln!("{} DEBUG: {}", self.prefix, message);
        }
    }

    fn info(&self, message: &str) {
        println!("{} {}", self.prefix, message);
    }

    fn warn(&self, message: &str) {
        eprintln!("{} WARN: {}", self.prefix, message);
    }

    fn error(&self, message: &str) {
        eprintln!("{} ERROR: {}", self.prefix, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_logger_creation() {
        let logger = ConsoleLogger::new();
        assert_eq!(logger.prefix, "[safebox]");
        assert!(!logger.verbose);

        let custom = ConsoleLogger::with_prefix("[deploy]").verbose(true);
        assert_eq!(custom.prefix, "[deploy]");
        assert!(custom.verbose);
    }

    #[test]
    fn test_console_logger_logs() {
        let logger = ConsoleLogger::new().verbose(true);
        logger.debug("debug message");
        logger.info("info message");
        logger.warn("warn message");
        logger.error("error message");
    }
}
