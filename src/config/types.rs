//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and loader configuration.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::constants::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, FETCH_TIMEOUT_SECS};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Library configuration for a [`Loader`](crate::Loader).
///
/// Base path and cache buster can also be set later through
/// `Loader::set_base_path` / `Loader::set_cache_buster`, but only once each
/// and only before the first identifier is normalized.
///
/// # Examples
///
/// ```
/// use script_loader::LoaderConfig;
/// use std::time::Duration;
///
/// let config = LoaderConfig {
///     base_path: Some("/lib/".to_string()),
///     stall_timeout: Some(Duration::from_secs(5)),
///     ..Default::default()
/// };
/// assert!(config.cache_buster.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    /// Prefix applied to every relative identifier
    pub base_path: Option<String>,

    /// Query string appended to every fetch URL (not to the identifier)
    pub cache_buster: Option<String>,

    /// How long a resource may stay `Loading` before it is reported as stalled.
    ///
    /// A stalled resource is only logged and counted; it stays `Loading` and a
    /// late settle signal is still honored.
    pub stall_timeout: Option<Duration>,
}

/// Command-line options for the `script_loader` binary.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "script_loader",
    about = "Fetches scripts through the dependency loader and reports when they are ready."
)]
pub struct Opt {
    /// Resources to load (absolute URLs or names relative to --base-path)
    #[arg(required = true)]
    pub resources: Vec<String>,

    /// Prefix applied to relative resource names
    #[arg(long)]
    pub base_path: Option<String>,

    /// Query string appended to every fetch URL
    #[arg(long)]
    pub cache_buster: Option<String>,

    /// Load resources one after another instead of in parallel
    #[arg(long)]
    pub ordered: bool,

    /// Topic label for the whole batch
    #[arg(long)]
    pub label: Option<String>,

    /// Seconds to wait for every resource before giving up
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = FETCH_TIMEOUT_SECS)]
    pub fetch_timeout_seconds: u64,

    /// HTTP User-Agent header value
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

impl From<&Opt> for LoaderConfig {
    fn from(opt: &Opt) -> Self {
        Self {
            base_path: opt.base_path.clone(),
            cache_buster: opt.cache_buster.clone(),
            stall_timeout: Some(Duration::from_secs(opt.timeout_seconds)),
        }
    }
}
