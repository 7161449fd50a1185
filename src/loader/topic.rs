//! Topic labels and dependency keys.
//!
//! A topic labels one requested batch. A dependency key is the set of topics
//! an `on_ready` callback waits for; its canonical form sorts the labels and
//! joins them with `|`, so `"b a"`, `"a|b"` and `["b", "a"]` all name the same
//! key.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::config::{DEPENDENCY_KEY_SEPARATOR, TOPIC_DELIMITERS};
use crate::error_handling::TopicError;

use super::ident::ResourceId;

/// Name of a batch of resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicLabel(String);

impl TopicLabel {
    /// Validates a caller-supplied label.
    ///
    /// # Errors
    ///
    /// `TopicError::EmptyLabel` for an empty or blank label,
    /// `TopicError::ReservedDelimiter` if it contains a space or `|`.
    pub fn new(label: impl Into<String>) -> Result<Self, TopicError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(TopicError::EmptyLabel);
        }
        if label.contains(TOPIC_DELIMITERS) {
            return Err(TopicError::ReservedDelimiter(label));
        }
        Ok(TopicLabel(label))
    }

    /// Default label of an unlabeled batch: its identifiers concatenated.
    ///
    /// Not validated. If an identifier contains a space or `|`, the label
    /// cannot be named through `on_ready`, since topic strings split on those
    /// characters; give such batches an explicit label.
    pub(crate) fn from_ids(ids: &[ResourceId]) -> Self {
        TopicLabel(ids.iter().map(ResourceId::as_str).collect())
    }

    /// The label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TopicLabel {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TopicLabel::new(s)
    }
}

/// Set of topics a callback waits for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyKey(BTreeSet<TopicLabel>);

impl DependencyKey {
    /// Parses a topic string delimited by spaces or `|`.
    ///
    /// Runs of delimiters are collapsed, so `"a  b"` and `"a||b"` both name
    /// `{a, b}`.
    ///
    /// # Errors
    ///
    /// `TopicError::Empty` if no label remains.
    pub fn parse(spec: &str) -> Result<Self, TopicError> {
        let labels: BTreeSet<TopicLabel> = spec
            .split(TOPIC_DELIMITERS)
            .filter(|piece| !piece.is_empty())
            .map(|piece| TopicLabel(piece.to_string()))
            .collect();
        if labels.is_empty() {
            return Err(TopicError::Empty);
        }
        Ok(DependencyKey(labels))
    }

    /// Builds a key from individual labels, validating each.
    pub fn from_labels<I, S>(labels: I) -> Result<Self, TopicError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels = labels
            .into_iter()
            .map(TopicLabel::new)
            .collect::<Result<BTreeSet<_>, _>>()?;
        if labels.is_empty() {
            return Err(TopicError::Empty);
        }
        Ok(DependencyKey(labels))
    }

    /// Labels in canonical (sorted) order.
    pub fn labels(&self) -> impl Iterator<Item = &TopicLabel> {
        self.0.iter()
    }

    /// Canonical serialization: sorted labels joined by `|`.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        for (i, label) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(DEPENDENCY_KEY_SEPARATOR);
            }
            out.push_str(label.as_str());
        }
        out
    }

    /// Labels not yet in `completed`, in canonical order.
    pub fn missing(&self, completed: &HashSet<TopicLabel>) -> Vec<TopicLabel> {
        self.0
            .iter()
            .filter(|label| !completed.contains(*label))
            .cloned()
            .collect()
    }

    /// True when every label is in `completed`.
    pub fn is_satisfied_by(&self, completed: &HashSet<TopicLabel>) -> bool {
        self.0.iter().all(|label| completed.contains(label))
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<TopicLabel> for DependencyKey {
    fn from(label: TopicLabel) -> Self {
        DependencyKey(BTreeSet::from([label]))
    }
}

/// Anything `on_ready` accepts as a topic set.
///
/// A single string is split on spaces and `|`; list elements are taken as
/// individual labels and must not contain delimiters.
pub trait IntoTopics {
    /// Converts into a validated dependency key.
    fn into_key(self) -> Result<DependencyKey, TopicError>;
}

impl IntoTopics for &str {
    fn into_key(self) -> Result<DependencyKey, TopicError> {
        DependencyKey::parse(self)
    }
}

impl IntoTopics for String {
    fn into_key(self) -> Result<DependencyKey, TopicError> {
        DependencyKey::parse(&self)
    }
}

impl IntoTopics for &String {
    fn into_key(self) -> Result<DependencyKey, TopicError> {
        DependencyKey::parse(self)
    }
}

impl<S: Into<String>> IntoTopics for Vec<S> {
    fn into_key(self) -> Result<DependencyKey, TopicError> {
        DependencyKey::from_labels(self)
    }
}

impl<S: Into<String>, const N: usize> IntoTopics for [S; N] {
    fn into_key(self) -> Result<DependencyKey, TopicError> {
        DependencyKey::from_labels(self)
    }
}

impl IntoTopics for &[&str] {
    fn into_key(self) -> Result<DependencyKey, TopicError> {
        DependencyKey::from_labels(self.iter().copied())
    }
}

impl IntoTopics for TopicLabel {
    fn into_key(self) -> Result<DependencyKey, TopicError> {
        Ok(DependencyKey::from(self))
    }
}

impl IntoTopics for DependencyKey {
    fn into_key(self) -> Result<DependencyKey, TopicError> {
        Ok(self)
    }
}
