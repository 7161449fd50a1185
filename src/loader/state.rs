//! Per-resource loading state.

use std::fmt;

/// Lifecycle of a tracked resource.
///
/// Transitions only move forward: `Unrequested -> Loading -> Loaded`.
/// There is no failure state; a fetch that never settles stays `Loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ResourceState {
    /// Never requested from this loader
    #[default]
    Unrequested,
    /// Fetch issued, waiting for its settle signal
    Loading,
    /// Settled; absorbing
    Loaded,
}

impl ResourceState {
    /// Moves to `next` if that is a forward transition.
    ///
    /// Returns false (and leaves the state alone) for a regression or a
    /// repeated transition into the current state.
    pub fn advance(&mut self, next: ResourceState) -> bool {
        if next > *self {
            *self = next;
            true
        } else {
            false
        }
    }

    /// True once the resource has settled.
    pub fn is_loaded(&self) -> bool {
        matches!(self, ResourceState::Loaded)
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceState::Unrequested => "unrequested",
            ResourceState::Loading => "loading",
            ResourceState::Loaded => "loaded",
        })
    }
}
