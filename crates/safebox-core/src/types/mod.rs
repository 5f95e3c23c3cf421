//! Core types for configuration entries
//!
//! This module contains the desired-state and persisted-state records shared
//! by every store backend.

mod config;

pub use config::{Config, ConfigInput, ConfigType};
