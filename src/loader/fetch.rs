//! The fetch primitive the loader delegates to.
//!
//! A `ResourceFetcher` starts loading one resource and reports completion
//! through a `Settler`. The settler wraps a one-shot channel, so only the
//! first settle signal counts; hosts that see several completion events for
//! one resource can forward every one of them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use log::trace;
use tokio::sync::oneshot;

use crate::error_handling::{LoaderEvent, LoaderStats};

use super::ident::ResourceId;

/// One fetch handed to a `ResourceFetcher`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Identifier the loader tracks the resource under
    pub id: ResourceId,
    /// URL to fetch (identifier plus any cache-busting query)
    pub url: String,
}

/// Single-use completion handle for one fetch.
///
/// Cloneable and `Send`, so it can be moved into whatever task or thread
/// observes the underlying completion. The first `settle()` marks the resource
/// loaded; every later call is ignored. Dropping all clones without settling
/// leaves the resource `Loading` for good.
#[derive(Clone)]
pub struct Settler {
    id: ResourceId,
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    stats: Arc<LoaderStats>,
}

impl Settler {
    pub(crate) fn new(
        id: ResourceId,
        tx: oneshot::Sender<()>,
        stats: Arc<LoaderStats>,
    ) -> Self {
        Settler {
            id,
            tx: Arc::new(Mutex::new(Some(tx))),
            stats,
        }
    }

    /// Signals that the resource is usable.
    ///
    /// Returns true for the signal that actually settled the resource and false
    /// for any repeat.
    pub fn settle(&self) -> bool {
        let sender = match self.tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => {
                // The watcher may be gone if the loader was dropped
                let _ = tx.send(());
                true
            }
            None => {
                self.stats.increment(LoaderEvent::DuplicateSettle);
                trace!("Ignoring repeated settle signal for {}", self.id);
                false
            }
        }
    }

    /// Identifier this settler belongs to.
    pub fn id(&self) -> &ResourceId {
        &self.id
    }
}

impl std::fmt::Debug for Settler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settler").field("id", &self.id).finish()
    }
}

/// Host capability that actually loads resources.
///
/// `fetch` must not block. It either settles immediately or arranges for the
/// settler to be called later; it may also never settle (failed fetch).
pub trait ResourceFetcher {
    /// Begins loading `request.url`.
    fn fetch(&self, request: FetchRequest, settler: Settler);
}

impl<F> ResourceFetcher for F
where
    F: Fn(FetchRequest, Settler),
{
    fn fetch(&self, request: FetchRequest, settler: Settler) {
        self(request, settler)
    }
}

/// Fetcher that records every request and settles only when told to.
///
/// Useful when the real completion signal comes from outside the process (a
/// browser bridge, a test harness): the host keeps a clone and calls
/// `settle` as completions arrive.
#[derive(Clone, Default)]
pub struct ManualFetcher {
    inner: Rc<RefCell<ManualLog>>,
}

#[derive(Default)]
struct ManualLog {
    requests: Vec<FetchRequest>,
    settlers: HashMap<ResourceId, Vec<Settler>>,
}

impl ManualFetcher {
    /// Creates an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifiers fetched so far, in issue order.
    pub fn fetched(&self) -> Vec<String> {
        self.inner
            .borrow()
            .requests
            .iter()
            .map(|r| r.id.to_string())
            .collect()
    }

    /// URLs handed to the fetcher so far, in issue order.
    pub fn urls(&self) -> Vec<String> {
        self.inner
            .borrow()
            .requests
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }

    /// How many times `id` was fetched.
    pub fn fetch_count(&self, id: &str) -> usize {
        self.inner
            .borrow()
            .requests
            .iter()
            .filter(|r| r.id.as_str() == id)
            .count()
    }

    /// Settles every outstanding fetch of `id`.
    ///
    /// Returns false if `id` was never fetched or had already been settled.
    /// The settlers are kept, so settling twice exercises the duplicate
    /// signal path.
    pub fn settle(&self, id: &str) -> bool {
        let settlers = self
            .inner
            .borrow()
            .settlers
            .get(&ResourceId::verbatim(id))
            .cloned()
            .unwrap_or_default();
        let mut settled = false;
        for settler in settlers {
            settled |= settler.settle();
        }
        settled
    }

    /// Drops the settlers of `id` without settling, simulating a failed fetch.
    pub fn fail(&self, id: &str) {
        self.inner
            .borrow_mut()
            .settlers
            .remove(&ResourceId::verbatim(id));
    }
}

impl ResourceFetcher for ManualFetcher {
    fn fetch(&self, request: FetchRequest, settler: Settler) {
        let mut log = self.inner.borrow_mut();
        log.settlers
            .entry(request.id.clone())
            .or_default()
            .push(settler);
        log.requests.push(request);
    }
}
