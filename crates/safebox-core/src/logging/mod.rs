//! Logging abstractions
//!
//! - `Logger` trait for reporting deploy progress and partial failures
//! - `file_logger` for backend debug traces (enable with `SAFEBOX_DEBUG=1`)

mod traits;
mod noop;
mod console;
pub mod file_logger;

pub use traits::{Logger, SharedLogger};
pub use noop::NoOpLogger;
pub use console::ConsoleLogger;

pub use file_logger::{log_file_path, LogLevel};
