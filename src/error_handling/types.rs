//! Error type definitions.
//!
//! This module defines the error types returned by the loader and its
//! initialization helpers, plus the event kinds counted by `LoaderStats`.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// A topic specification that can never be satisfied.
///
/// Rejected up front instead of registering a dependency key nobody can complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicError {
    /// No topic labels at all (empty string, only delimiters, or empty list).
    #[error("Topic specification is empty")]
    Empty,

    /// One label in a list is empty.
    #[error("Topic specification contains an empty label")]
    EmptyLabel,

    /// A single label contains a character reserved for delimiting labels.
    #[error("Topic label '{0}' contains a reserved delimiter (space or '|')")]
    ReservedDelimiter(String),

    /// A batch names an empty resource.
    #[error("Batch contains an empty resource name")]
    EmptyResource,
}

/// Error types for the global configuration surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `set_base_path` was called more than once.
    #[error("Base path is already set to '{0}'")]
    BasePathAlreadySet(String),

    /// `set_cache_buster` was called more than once.
    #[error("Cache buster is already set to '{0}'")]
    CacheBusterAlreadySet(String),

    /// Configuration changed after identifiers were already normalized.
    #[error("Loader configuration cannot change after the first request")]
    AlreadyInUse,
}

/// Errors returned by the public loader operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    /// Malformed topic specification or empty batch.
    #[error("Malformed topic specification: {0}")]
    MalformedTopic(#[from] TopicError),

    /// Invalid configuration change.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors reported by the HTTP fetcher.
///
/// These never reach loader callers: a failed fetch simply never settles.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure (connect, timeout, body).
    #[error("HTTP request failed: {0}")]
    Http(#[from] ReqwestError),

    /// The server answered with a non-success status.
    #[error("HTTP status {0}")]
    Status(u16),
}

/// Events counted by `LoaderStats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum LoaderEvent {
    /// The fetch primitive was invoked for a resource
    FetchIssued,
    /// A request attached to a resource already `Loading` or `Loaded`
    DuplicateRequest,
    /// A resource reached `Loaded`
    ResourceSettled,
    /// A settle signal arrived after the resource had already settled
    DuplicateSettle,
    /// A resource exceeded the stall timeout
    StalledResource,
    /// A topic label entered the completion set
    TopicCompleted,
    /// A registry callback was flushed
    CallbackFlushed,
}

impl std::fmt::Display for LoaderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LoaderEvent {
    /// Returns a human-readable name for the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoaderEvent::FetchIssued => "Fetch issued",
            LoaderEvent::DuplicateRequest => "Duplicate request",
            LoaderEvent::ResourceSettled => "Resource settled",
            LoaderEvent::DuplicateSettle => "Duplicate settle signal",
            LoaderEvent::StalledResource => "Stalled resource",
            LoaderEvent::TopicCompleted => "Topic completed",
            LoaderEvent::CallbackFlushed => "Callback flushed",
        }
    }
}
