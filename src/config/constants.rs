//! Configuration constants.
//!
//! This module defines the constants used by identifier normalization, topic
//! parsing, and the HTTP fetcher.

/// Suffix appended to identifiers whose last path segment has no extension.
pub const DEFAULT_EXTENSION: &str = ".js";

/// Identifiers matching this pattern are absolute and never get the base path.
/// Protocol-relative identifiers (`//host/path`) are treated as absolute too.
pub const URL_SCHEME_PATTERN: &str = r"^(?:https?:)?//";

/// Characters separating topic labels in a single topic string.
///
/// Both are accepted by `on_ready`: historical call sites used either a space
/// separated list or the `|` joined dependency key itself.
pub const TOPIC_DELIMITERS: &[char] = &[' ', '|'];

/// Separator used when serializing a dependency key.
pub const DEPENDENCY_KEY_SEPARATOR: char = '|';

/// Per-request timeout for the HTTP fetcher in seconds
pub const FETCH_TIMEOUT_SECS: u64 = 10;

/// Default CLI wait for every resource, in seconds; also the CLI's stall timeout.
/// The library default is no stall timeout at all (see `LoaderConfig`).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent string for script fetches.
///
/// Users can override this via the `--user-agent` CLI flag.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
