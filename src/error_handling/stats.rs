//! Loader statistics tracking.
//!
//! Counts loader events (fetches, deduplicated requests, settles, stalls) so a
//! host can see how much work the deduplication saved and which resources
//! never arrived.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::LoaderEvent;

/// Event counters for one loader instance.
///
/// Every `LoaderEvent` is initialized to zero on creation. Counters are atomic
/// so a snapshot can be read from any task.
pub struct LoaderStats {
    events: HashMap<LoaderEvent, AtomicUsize>,
}

impl LoaderStats {
    /// Creates counters for every event, all at zero.
    pub fn new() -> Self {
        let mut events = HashMap::new();
        for event in LoaderEvent::iter() {
            events.insert(event, AtomicUsize::new(0));
        }
        LoaderStats { events }
    }

    /// Increment an event counter.
    pub fn increment(&self, event: LoaderEvent) {
        if let Some(counter) = self.events.get(&event) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment counter for {:?} which is not in the map. \
                 This indicates a bug in LoaderStats initialization.",
                event
            );
        }
    }

    /// Get the count for an event.
    pub fn get(&self, event: LoaderEvent) -> usize {
        self.events
            .get(&event)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Copies every counter into a plain snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fetches_issued: self.get(LoaderEvent::FetchIssued),
            duplicate_requests: self.get(LoaderEvent::DuplicateRequest),
            resources_settled: self.get(LoaderEvent::ResourceSettled),
            duplicate_settles: self.get(LoaderEvent::DuplicateSettle),
            stalled_resources: self.get(LoaderEvent::StalledResource),
            topics_completed: self.get(LoaderEvent::TopicCompleted),
            callbacks_flushed: self.get(LoaderEvent::CallbackFlushed),
        }
    }
}

impl Default for LoaderStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of `LoaderStats`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Times the fetch primitive was invoked
    pub fetches_issued: usize,
    /// Requests satisfied by an existing fetch
    pub duplicate_requests: usize,
    /// Resources that reached `Loaded`
    pub resources_settled: usize,
    /// Settle signals ignored because the resource had already settled
    pub duplicate_settles: usize,
    /// Resources that exceeded the stall timeout
    pub stalled_resources: usize,
    /// Topic labels that entered the completion set
    pub topics_completed: usize,
    /// Registry callbacks flushed
    pub callbacks_flushed: usize,
}

impl StatsSnapshot {
    /// Returns the deduplication ratio (0.0 to 1.0)
    pub fn dedup_ratio(&self) -> f64 {
        let total = self.fetches_issued + self.duplicate_requests;
        if total == 0 {
            0.0
        } else {
            self.duplicate_requests as f64 / total as f64
        }
    }
}
