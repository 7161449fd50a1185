//! Error handling and loader statistics.
//!
//! This module provides:
//! - Error type definitions for the loader, its configuration, and initialization
//! - Loader event statistics (fetches, deduplicated requests, stalls)
//!
//! Fetch failures are deliberately absent from the public error surface: a
//! resource whose fetch fails never settles, and its dependents never fire.

mod stats;
mod types;

// Re-export public API
pub use stats::{LoaderStats, StatsSnapshot};
pub use types::{ConfigError, FetchError, InitializationError, LoaderError, LoaderEvent, TopicError};
