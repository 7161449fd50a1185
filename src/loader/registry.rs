//! Pending-callback registry.
//!
//! Callbacks waiting on a dependency key are kept in registration order, both
//! across keys and within one key. Flushing removes every satisfied entry in
//! a single pass.

use std::collections::HashSet;

use super::batch::Callback;
use super::topic::{DependencyKey, TopicLabel};

#[derive(Default)]
pub(crate) struct PendingRegistry {
    entries: Vec<(DependencyKey, Vec<Callback>)>,
}

impl PendingRegistry {
    /// Appends `callback` to the list for `key`.
    pub(crate) fn register(&mut self, key: DependencyKey, callback: Callback) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, callbacks)) => callbacks.push(callback),
            None => self.entries.push((key, vec![callback])),
        }
    }

    /// Removes and returns the callbacks of every key satisfied by
    /// `completed`, keys in registration order and callbacks FIFO.
    pub(crate) fn take_satisfied(&mut self, completed: &HashSet<TopicLabel>) -> Vec<Callback> {
        let mut ready = Vec::new();
        let mut remaining = Vec::with_capacity(self.entries.len());
        for (key, callbacks) in self.entries.drain(..) {
            if key.is_satisfied_by(completed) {
                ready.extend(callbacks);
            } else {
                remaining.push((key, callbacks));
            }
        }
        self.entries = remaining;
        ready
    }

    /// Number of callbacks still waiting.
    pub(crate) fn pending(&self) -> usize {
        self.entries.iter().map(|(_, callbacks)| callbacks.len()).sum()
    }
}
