//! Loader configuration and constants.
//!
//! This module provides:
//! - Configuration constants (default suffix, URL pattern, topic delimiters, timeouts)
//! - Library configuration (`LoaderConfig`)
//! - CLI option types and parsing

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{LoaderConfig, LogFormat, LogLevel, Opt};
