//! Resource identifiers and their normalization.
//!
//! A raw resource name becomes a `ResourceId` by:
//! 1. leaving absolute URLs (`http://`, `https://`, `//`) untouched,
//! 2. prefixing everything else with the configured base path,
//! 3. appending `.js` when the last path segment has no extension.
//!
//! Normalizing an already-normalized identifier returns it unchanged.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::{DEFAULT_EXTENSION, URL_SCHEME_PATTERN};

static ABSOLUTE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(URL_SCHEME_PATTERN).expect("URL_SCHEME_PATTERN is a valid regex")
});

/// Normalized identifier of a tracked resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(String);

impl ResourceId {
    /// Wraps a URL without normalizing it.
    ///
    /// Used for resources fetched by their exact URL (`Loader::get`).
    pub fn verbatim(url: impl Into<String>) -> Self {
        ResourceId(url.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The URL handed to the fetch primitive: the identifier plus the
    /// cache-busting query, joined with `?` or `&` as appropriate.
    pub fn fetch_url(&self, cache_buster: Option<&str>) -> String {
        match cache_buster {
            Some(args) if !args.is_empty() => {
                let joiner = if self.0.contains('?') { '&' } else { '?' };
                format!("{}{}{}", self.0, joiner, args)
            }
            _ => self.0.clone(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Returns true for absolute and protocol-relative URLs.
pub fn is_absolute(raw: &str) -> bool {
    ABSOLUTE_URL.is_match(raw)
}

/// Splits `path?query#fragment` into the path and the remainder (including
/// its leading `?` or `#`).
fn split_suffix(raw: &str) -> (&str, &str) {
    match raw.find(['?', '#']) {
        Some(idx) => raw.split_at(idx),
        None => (raw, ""),
    }
}

/// Returns true if the last path segment carries a `.ext` suffix.
///
/// Dot-files (`.hidden`) and trailing dots (`name.`) do not count.
pub fn has_extension(raw: &str) -> bool {
    let (path, _) = split_suffix(raw);
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rfind('.') {
        Some(idx) => idx > 0 && idx + 1 < segment.len(),
        None => false,
    }
}

/// Normalizes a raw resource name against `base_path`.
///
/// Absolute identifiers are returned unchanged. A relative name is prefixed
/// with `base_path` unless its text already starts with it, so normalizing
/// twice gives the same identifier. That check is textual: with base path
/// `js/`, the name `js/app` stays `js/app.js` rather than `js/js/app.js`, and
/// with base path `lib`, `libx` becomes `libx.js`. Finally `.js` is added
/// before any query or fragment when the last segment has no extension.
pub fn normalize(raw: &str, base_path: &str) -> ResourceId {
    if is_absolute(raw) {
        return ResourceId(raw.to_string());
    }

    let mut joined = if base_path.is_empty() || raw.starts_with(base_path) {
        raw.to_string()
    } else {
        format!("{}{}", base_path, raw)
    };

    if !has_extension(&joined) {
        let (path, rest) = split_suffix(&joined);
        joined = format!("{}{}{}", path, DEFAULT_EXTENSION, rest);
    }

    ResourceId(joined)
}
