//! Asynchronous resource-dependency loader.
//!
//! The loader fetches each resource at most once, tracks every resource's
//! state, and fires callbacks when named batches ("topics") have finished
//! loading.
//!
//! # Scheduling
//!
//! All state lives in one `Loader` and is only touched from the thread that
//! drives it, inside a Tokio `LocalSet`. Every callback the loader fires runs
//! on a task spawned with `spawn_local`, never inside the public call that
//! registered it. A caller can therefore register `on_ready` for a topic and
//! `request` that topic in the same synchronous block without the callback
//! running in between.
//!
//! # Failures
//!
//! There is no failure state and no retry. A fetch that never settles keeps
//! its resource `Loading`, and every topic depending on it stays pending.
//! With `LoaderConfig::stall_timeout` set, such resources are logged and
//! counted, but dependents still do not fire.

mod batch;
mod fetch;
mod http;
mod ident;
mod registry;
mod state;
mod topic;

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::sync::oneshot;

use crate::config::LoaderConfig;
use crate::error_handling::{
    ConfigError, LoaderError, LoaderEvent, LoaderStats, StatsSnapshot, TopicError,
};

pub use batch::{BatchRequest, Callback, OrderedRequest};
pub use fetch::{FetchRequest, ManualFetcher, ResourceFetcher, Settler};
pub use http::HttpFetcher;
pub use ident::{has_extension, is_absolute, normalize, ResourceId};
pub use state::ResourceState;
pub use topic::{DependencyKey, IntoTopics, TopicLabel};

use registry::PendingRegistry;

type BatchId = u64;

struct ResourceEntry {
    state: ResourceState,
    /// One entry per batch occurrence waiting on this resource
    waiters: Vec<BatchId>,
}

struct PendingBatch {
    label: Option<TopicLabel>,
    remaining: usize,
    on_complete: Option<Callback>,
}

#[derive(Default)]
struct LoaderState {
    base_path: Option<String>,
    cache_buster: Option<String>,
    in_use: bool,
    resources: HashMap<ResourceId, ResourceEntry>,
    batches: HashMap<BatchId, PendingBatch>,
    next_batch: BatchId,
    completed: HashSet<TopicLabel>,
    /// Batches still loading under each label
    outstanding: HashMap<TopicLabel, usize>,
    registry: PendingRegistry,
}

impl LoaderState {
    fn normalize(&self, raw: &str) -> ResourceId {
        normalize(raw, self.base_path.as_deref().unwrap_or(""))
    }
}

/// Resource dependency loader.
///
/// Cheap to clone; clones share the same state. Not `Send`: drive it from a
/// single `LocalSet`.
///
/// # Example
///
/// ```no_run
/// use script_loader::{BatchRequest, Loader, ManualFetcher};
///
/// # async fn example() -> Result<(), script_loader::LoaderError> {
/// let local = tokio::task::LocalSet::new();
/// local
///     .run_until(async {
///         let fetcher = ManualFetcher::new();
///         let loader = Loader::new(fetcher.clone());
///         loader.set_base_path("/lib/")?;
///
///         loader.on_ready("jquery", || println!("jquery ready"))?;
///         loader.request(BatchRequest::from("jquery").label("jquery"))?;
///
///         fetcher.settle("/lib/jquery.js");
///         loader.ready("jquery").await
///     })
///     .await
/// # }
/// ```
#[derive(Clone)]
pub struct Loader {
    inner: Rc<RefCell<LoaderState>>,
    fetcher: Rc<dyn ResourceFetcher>,
    stats: Arc<LoaderStats>,
    stall_timeout: Option<Duration>,
}

impl Loader {
    /// Creates a loader with default configuration.
    pub fn new(fetcher: impl ResourceFetcher + 'static) -> Self {
        Self::with_config(fetcher, LoaderConfig::default())
    }

    /// Creates a loader with the given configuration.
    pub fn with_config(fetcher: impl ResourceFetcher + 'static, config: LoaderConfig) -> Self {
        let state = LoaderState {
            base_path: config.base_path,
            cache_buster: config.cache_buster,
            ..Default::default()
        };
        Loader {
            inner: Rc::new(RefCell::new(state)),
            fetcher: Rc::new(fetcher),
            stats: Arc::new(LoaderStats::new()),
            stall_timeout: config.stall_timeout,
        }
    }

    /// Sets the prefix applied to relative identifiers.
    ///
    /// # Errors
    ///
    /// `ConfigError::BasePathAlreadySet` on a second call,
    /// `ConfigError::AlreadyInUse` after the first request.
    pub fn set_base_path(&self, path: impl Into<String>) -> Result<(), LoaderError> {
        let mut st = self.inner.borrow_mut();
        if st.in_use {
            return Err(ConfigError::AlreadyInUse.into());
        }
        if let Some(existing) = &st.base_path {
            return Err(ConfigError::BasePathAlreadySet(existing.clone()).into());
        }
        st.base_path = Some(path.into());
        Ok(())
    }

    /// Sets the query string appended to every fetch URL.
    ///
    /// Identifiers are not affected, so deduplication ignores the suffix.
    ///
    /// # Errors
    ///
    /// `ConfigError::CacheBusterAlreadySet` on a second call,
    /// `ConfigError::AlreadyInUse` after the first request.
    pub fn set_cache_buster(&self, args: impl Into<String>) -> Result<(), LoaderError> {
        let mut st = self.inner.borrow_mut();
        if st.in_use {
            return Err(ConfigError::AlreadyInUse.into());
        }
        if let Some(existing) = &st.cache_buster {
            return Err(ConfigError::CacheBusterAlreadySet(existing.clone()).into());
        }
        st.cache_buster = Some(args.into());
        Ok(())
    }

    /// Requests a batch of resources.
    ///
    /// Resources not yet requested are fetched; resources already loading
    /// or loaded are shared with the earlier request. Once every resource of
    /// the batch has loaded, its label is marked complete (unless another
    /// batch under the same label is still loading), its callback fires, and
    /// every `on_ready` callback whose topics are now all complete is flushed
    /// in registration order.
    ///
    /// # Errors
    ///
    /// `LoaderError::MalformedTopic` for an empty batch, an empty resource
    /// name or an invalid label. Nothing is fetched in that case.
    pub fn request(&self, batch: impl Into<BatchRequest>) -> Result<(), LoaderError> {
        let batch = batch.into();
        let label = batch.validate()?;
        let (resources, on_complete) = batch.into_parts();
        self.submit_resources(resources, label, on_complete);
        Ok(())
    }

    /// Requests resources strictly in order.
    ///
    /// Step *i+1* is not fetched before every resource of step *i* has
    /// loaded; a step that never settles stops the chain there.
    ///
    /// # Errors
    ///
    /// `LoaderError::MalformedTopic` if any step is empty or the label is
    /// invalid. All steps are checked before the first fetch.
    pub fn request_ordered(&self, ordered: impl Into<OrderedRequest>) -> Result<(), LoaderError> {
        let ordered = ordered.into();
        let label = ordered.validate()?;
        let (steps, on_complete) = ordered.into_parts();
        self.request_chain(VecDeque::from(steps), label, on_complete);
        Ok(())
    }

    /// Fetches a resource by its exact URL, outside any topic.
    ///
    /// No base path or extension is applied. The resource is still tracked,
    /// so a later `request` naming the same identifier does not fetch again.
    ///
    /// # Errors
    ///
    /// `TopicError::EmptyResource` for an empty URL.
    pub fn get(&self, url: &str, callback: impl FnOnce() + 'static) -> Result<(), LoaderError> {
        if url.trim().is_empty() {
            return Err(TopicError::EmptyResource.into());
        }
        self.inner.borrow_mut().in_use = true;
        self.submit(
            vec![ResourceId::verbatim(url)],
            None,
            Some(Box::new(callback)),
        );
        Ok(())
    }

    /// Runs `callback` once every topic in `topics` is complete.
    ///
    /// If they already are, the callback is still deferred to a later task.
    ///
    /// # Errors
    ///
    /// `LoaderError::MalformedTopic` for an empty or invalid topic set.
    pub fn on_ready(
        &self,
        topics: impl IntoTopics,
        callback: impl FnOnce() + 'static,
    ) -> Result<(), LoaderError> {
        self.register_ready(topics.into_key()?, Box::new(callback), None::<fn(&[TopicLabel])>);
        Ok(())
    }

    /// Like `on_ready`, and if some topics are still pending, calls
    /// `on_incomplete` right away with the missing labels.
    ///
    /// # Errors
    ///
    /// `LoaderError::MalformedTopic` for an empty or invalid topic set.
    pub fn on_ready_or_else(
        &self,
        topics: impl IntoTopics,
        callback: impl FnOnce() + 'static,
        on_incomplete: impl FnOnce(&[TopicLabel]),
    ) -> Result<(), LoaderError> {
        self.register_ready(topics.into_key()?, Box::new(callback), Some(on_incomplete));
        Ok(())
    }

    /// Resolves once every topic in `topics` is complete.
    ///
    /// Never resolves if one of them never completes.
    ///
    /// # Errors
    ///
    /// `LoaderError::MalformedTopic` for an empty or invalid topic set.
    pub async fn ready(&self, topics: impl IntoTopics) -> Result<(), LoaderError> {
        let key = topics.into_key()?;
        let (tx, rx) = oneshot::channel();
        self.register_ready(
            key,
            Box::new(move || {
                let _ = tx.send(());
            }),
            None::<fn(&[TopicLabel])>,
        );
        if rx.await.is_err() {
            // Loader state dropped with the callback still pending
            futures::future::pending::<()>().await;
        }
        Ok(())
    }

    /// Runs `callback` after the requests queued so far in this tick.
    pub fn when_idle(&self, callback: impl FnOnce() + 'static) {
        self.submit(Vec::new(), None, Some(Box::new(callback)));
    }

    /// Current state of the resource `raw` normalizes to.
    pub fn state(&self, raw: &str) -> ResourceState {
        let st = self.inner.borrow();
        let id = if is_absolute(raw) || st.resources.contains_key(&ResourceId::verbatim(raw)) {
            ResourceId::verbatim(raw)
        } else {
            st.normalize(raw)
        };
        st.resources
            .get(&id)
            .map(|entry| entry.state)
            .unwrap_or_default()
    }

    /// True once `label` has entered the completion set.
    ///
    /// A label enters the set when no batch requested under it is still
    /// loading, and never leaves it. Strings that are not valid labels are
    /// never complete.
    pub fn is_complete(&self, label: &str) -> bool {
        match TopicLabel::new(label) {
            Ok(label) => self.inner.borrow().completed.contains(&label),
            Err(_) => false,
        }
    }

    /// Number of `on_ready` callbacks still waiting.
    pub fn pending_callbacks(&self) -> usize {
        self.inner.borrow().registry.pending()
    }

    /// Snapshot of the loader's event counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn request_chain(
        &self,
        mut steps: VecDeque<Vec<String>>,
        label: Option<TopicLabel>,
        on_complete: Option<Callback>,
    ) {
        let Some(step) = steps.pop_front() else {
            return;
        };
        if steps.is_empty() {
            self.submit_resources(step, label, on_complete);
        } else {
            let loader = self.clone();
            self.submit_resources(
                step,
                None,
                Some(Box::new(move || loader.request_chain(steps, label, on_complete))),
            );
        }
    }

    /// Normalizes raw names and submits them under `label` or the default
    /// concatenated label.
    fn submit_resources(
        &self,
        resources: Vec<String>,
        label: Option<TopicLabel>,
        on_complete: Option<Callback>,
    ) {
        let ids: Vec<ResourceId> = {
            let mut st = self.inner.borrow_mut();
            st.in_use = true;
            resources.iter().map(|raw| st.normalize(raw)).collect()
        };
        let label = label.unwrap_or_else(|| TopicLabel::from_ids(&ids));
        self.submit(ids, Some(label), on_complete);
    }

    fn submit(&self, ids: Vec<ResourceId>, label: Option<TopicLabel>, on_complete: Option<Callback>) {
        let total = ids.len();
        let mut to_fetch = Vec::new();
        let mut already_loaded = 0;
        let batch_id = {
            let mut st = self.inner.borrow_mut();
            let batch_id = st.next_batch;
            st.next_batch += 1;
            if let Some(label) = &label {
                *st.outstanding.entry(label.clone()).or_default() += 1;
            }
            st.batches.insert(
                batch_id,
                PendingBatch {
                    label,
                    remaining: total,
                    on_complete,
                },
            );

            for id in ids {
                match st.resources.entry(id) {
                    Entry::Occupied(mut entry) => {
                        self.stats.increment(LoaderEvent::DuplicateRequest);
                        let entry = entry.get_mut();
                        if entry.state.is_loaded() {
                            already_loaded += 1;
                        } else {
                            entry.waiters.push(batch_id);
                        }
                    }
                    Entry::Vacant(entry) => {
                        to_fetch.push(entry.key().clone());
                        entry.insert(ResourceEntry {
                            state: ResourceState::Loading,
                            waiters: vec![batch_id],
                        });
                    }
                }
            }
            batch_id
        };

        // Loaded resources and empty batches still count down on a later task
        if already_loaded > 0 || total == 0 {
            let loader = self.clone();
            tokio::task::spawn_local(async move {
                loader.release(batch_id, already_loaded);
            });
        }

        for id in to_fetch {
            self.start_fetch(id);
        }
    }

    fn start_fetch(&self, id: ResourceId) {
        let url = id.fetch_url(self.inner.borrow().cache_buster.as_deref());
        let (tx, rx) = oneshot::channel();
        let settler = Settler::new(id.clone(), tx, self.stats.clone());

        self.stats.increment(LoaderEvent::FetchIssued);
        debug!("Fetching {}", url);

        let loader = self.clone();
        let watched = id.clone();
        tokio::task::spawn_local(async move {
            loader.watch(watched, rx).await;
        });

        self.fetcher.fetch(FetchRequest { id, url }, settler);
    }

    /// Waits for the settle signal of `id`, reporting it as stalled once the
    /// stall timeout passes.
    async fn watch(self, id: ResourceId, mut rx: oneshot::Receiver<()>) {
        let settled = match self.stall_timeout {
            None => (&mut rx).await.is_ok(),
            Some(limit) => match tokio::time::timeout(limit, &mut rx).await {
                Ok(result) => result.is_ok(),
                Err(_) => {
                    self.stats.increment(LoaderEvent::StalledResource);
                    warn!("Resource {} has not settled after {:?}", id, limit);
                    (&mut rx).await.is_ok()
                }
            },
        };

        if settled {
            self.settle(id);
        } else {
            debug!("Resource {} will never settle: fetch abandoned", id);
        }
    }

    fn settle(&self, id: ResourceId) {
        let waiters = {
            let mut st = self.inner.borrow_mut();
            let Some(entry) = st.resources.get_mut(&id) else {
                return;
            };
            if !entry.state.advance(ResourceState::Loaded) {
                return;
            }
            std::mem::take(&mut entry.waiters)
        };

        self.stats.increment(LoaderEvent::ResourceSettled);
        debug!("Loaded {} ({} waiting)", id, waiters.len());

        for batch_id in waiters {
            self.release(batch_id, 1);
        }
    }

    fn release(&self, batch_id: BatchId, count: usize) {
        let finished = {
            let mut st = self.inner.borrow_mut();
            let Some(batch) = st.batches.get_mut(&batch_id) else {
                return;
            };
            batch.remaining = batch.remaining.saturating_sub(count);
            if batch.remaining == 0 {
                st.batches.remove(&batch_id)
            } else {
                None
            }
        };

        if let Some(batch) = finished {
            self.complete_batch(batch);
        }
    }

    fn complete_batch(&self, batch: PendingBatch) {
        if let Some(label) = batch.label {
            let newly_complete = {
                let mut st = self.inner.borrow_mut();
                let idle = match st.outstanding.get_mut(&label) {
                    Some(count) => {
                        *count = count.saturating_sub(1);
                        *count == 0
                    }
                    None => true,
                };
                if idle {
                    st.outstanding.remove(&label);
                    st.completed.insert(label.clone())
                } else {
                    trace!("Topic {} still has batches loading", label);
                    false
                }
            };
            if newly_complete {
                self.stats.increment(LoaderEvent::TopicCompleted);
                debug!("Topic {} complete", label);
            }
        }

        if let Some(on_complete) = batch.on_complete {
            on_complete();
        }

        let flushed = {
            let mut st = self.inner.borrow_mut();
            let LoaderState {
                registry,
                completed,
                ..
            } = &mut *st;
            registry.take_satisfied(completed)
        };
        if !flushed.is_empty() {
            trace!("Flushing {} ready callbacks", flushed.len());
        }
        for callback in flushed {
            self.stats.increment(LoaderEvent::CallbackFlushed);
            callback();
        }
    }

    fn register_ready<F>(&self, key: DependencyKey, callback: Callback, on_incomplete: Option<F>)
    where
        F: FnOnce(&[TopicLabel]),
    {
        let missing = key.missing(&self.inner.borrow().completed);
        if missing.is_empty() {
            trace!("Topics {} already complete; deferring callback", key);
            tokio::task::spawn_local(async move { callback() });
            return;
        }

        trace!("Waiting on {} (missing {})", key, missing.len());
        self.inner.borrow_mut().registry.register(key, callback);
        if let Some(on_incomplete) = on_incomplete {
            on_incomplete(&missing);
        }
    }
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
