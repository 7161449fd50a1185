// Loader module tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tokio::task::LocalSet;

use super::*;

/// Lets every queued local task run, including chains of tasks that wake
/// each other.
async fn drain() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

fn bump(counter: &Rc<Cell<usize>>) -> impl FnOnce() + 'static {
    let counter = counter.clone();
    move || counter.set(counter.get() + 1)
}

fn record(log: &Rc<RefCell<Vec<String>>>, entry: &str) -> impl FnOnce() + 'static {
    let log = log.clone();
    let entry = entry.to_string();
    move || log.borrow_mut().push(entry)
}

#[tokio::test]
async fn test_same_resource_is_fetched_once() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            let hits = Rc::new(Cell::new(0));

            loader
                .request(BatchRequest::from("alpha").on_complete(bump(&hits)))
                .unwrap();
            loader
                .request(BatchRequest::from("alpha").on_complete(bump(&hits)))
                .unwrap();
            drain().await;

            assert_eq!(fetcher.fetch_count("alpha.js"), 1);
            assert_eq!(loader.state("alpha"), ResourceState::Loading);
            assert_eq!(hits.get(), 0);

            assert!(fetcher.settle("alpha.js"));
            drain().await;

            assert_eq!(hits.get(), 2);
            assert_eq!(loader.state("alpha"), ResourceState::Loaded);
            let stats = loader.stats();
            assert_eq!(stats.fetches_issued, 1);
            assert_eq!(stats.duplicate_requests, 1);
            assert_eq!(stats.resources_settled, 1);
        })
        .await;
}

#[tokio::test]
async fn test_duplicates_within_one_batch_share_a_fetch() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            let hits = Rc::new(Cell::new(0));

            loader
                .request(BatchRequest::from(["a", "a.js", "a"]).on_complete(bump(&hits)))
                .unwrap();
            assert_eq!(fetcher.fetched(), vec!["a.js".to_string()]);

            fetcher.settle("a.js");
            drain().await;
            assert_eq!(hits.get(), 1);
        })
        .await;
}

#[tokio::test]
async fn test_loaded_resource_completes_without_new_fetch() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            loader.request("alpha").unwrap();
            fetcher.settle("alpha.js");
            drain().await;

            let hits = Rc::new(Cell::new(0));
            loader
                .request(BatchRequest::from("alpha").label("again").on_complete(bump(&hits)))
                .unwrap();
            // Deferred, never inside the request call
            assert_eq!(hits.get(), 0);
            drain().await;

            assert_eq!(hits.get(), 1);
            assert!(loader.is_complete("again"));
            assert_eq!(fetcher.fetch_count("alpha.js"), 1);
        })
        .await;
}

#[tokio::test]
async fn test_default_label_is_concatenated_identifiers() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            loader.request(["a", "b"]).unwrap();
            fetcher.settle("a.js");
            fetcher.settle("b.js");
            drain().await;

            assert!(loader.is_complete("a.jsb.js"));
            assert!(!loader.is_complete("a.js"));
        })
        .await;
}

#[tokio::test]
async fn test_batch_completes_only_after_every_resource() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            let hits = Rc::new(Cell::new(0));

            loader
                .request(BatchRequest::from(["a", "b"]).label("ab").on_complete(bump(&hits)))
                .unwrap();
            fetcher.settle("a.js");
            drain().await;
            assert_eq!(hits.get(), 0);
            assert!(!loader.is_complete("ab"));

            fetcher.settle("b.js");
            drain().await;
            assert_eq!(hits.get(), 1);
            assert!(loader.is_complete("ab"));
        })
        .await;
}

#[tokio::test]
async fn test_label_waits_for_every_batch_under_it() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            let hits = Rc::new(Cell::new(0));
            let first = Rc::new(Cell::new(0));

            loader.on_ready("t", bump(&hits)).unwrap();
            loader
                .request(BatchRequest::from("x").label("t").on_complete(bump(&first)))
                .unwrap();
            loader.request(BatchRequest::from("y").label("t")).unwrap();

            fetcher.settle("x.js");
            drain().await;
            // The first batch's own callback fires; the label does not
            assert_eq!(first.get(), 1);
            assert_eq!(hits.get(), 0);
            assert_eq!(loader.state("y"), ResourceState::Loading);
            assert!(!loader.is_complete("t"));
            assert_eq!(loader.pending_callbacks(), 1);

            fetcher.settle("y.js");
            drain().await;
            assert_eq!(hits.get(), 1);
            assert!(loader.is_complete("t"));
            assert_eq!(loader.stats().topics_completed, 1);
        })
        .await;
}

#[tokio::test]
async fn test_is_complete_rejects_invalid_labels() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            loader.request(["a", "b"]).unwrap();
            fetcher.settle("a.js");
            fetcher.settle("b.js");
            drain().await;

            assert!(loader.is_complete("a.jsb.js"));
            assert!(!loader.is_complete(""));
            assert!(!loader.is_complete("a.js b.js"));
            assert!(!loader.is_complete("a.js|b.js"));
        })
        .await;
}

#[tokio::test]
async fn test_completion_callback_runs_before_ready_callbacks() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            let log = Rc::new(RefCell::new(Vec::new()));

            loader.on_ready("t", record(&log, "ready-1")).unwrap();
            loader.on_ready("t", record(&log, "ready-2")).unwrap();
            loader
                .request(BatchRequest::from("x").label("t").on_complete(record(&log, "complete")))
                .unwrap();

            fetcher.settle("x.js");
            drain().await;

            assert_eq!(*log.borrow(), vec!["complete", "ready-1", "ready-2"]);
            assert_eq!(loader.pending_callbacks(), 0);
            assert_eq!(loader.stats().callbacks_flushed, 2);
        })
        .await;
}

#[tokio::test]
async fn test_inline_settle_never_fires_inside_registration_block() {
    LocalSet::new()
        .run_until(async {
            // A fetcher that settles synchronously from inside fetch()
            let loader = Loader::new(|_request: FetchRequest, settler: Settler| {
                settler.settle();
            });
            let hits = Rc::new(Cell::new(0));

            loader.on_ready("t", bump(&hits)).unwrap();
            loader.request(BatchRequest::from("x").label("t")).unwrap();
            assert_eq!(hits.get(), 0);
            assert_eq!(loader.state("x"), ResourceState::Loading);

            drain().await;
            assert_eq!(hits.get(), 1);
        })
        .await;
}

#[tokio::test]
async fn test_on_ready_for_completed_topic_is_deferred() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            loader.request(BatchRequest::from("x").label("a")).unwrap();
            fetcher.settle("x.js");
            drain().await;

            let hits = Rc::new(Cell::new(0));
            loader.on_ready("a", bump(&hits)).unwrap();
            assert_eq!(hits.get(), 0);
            drain().await;
            assert_eq!(hits.get(), 1);

            drain().await;
            assert_eq!(hits.get(), 1);
        })
        .await;
}

#[tokio::test]
async fn test_on_ready_or_else_reports_missing_topics() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            loader.request(BatchRequest::from("x").label("a")).unwrap();
            fetcher.settle("x.js");
            drain().await;

            let missing = Rc::new(RefCell::new(Vec::new()));
            let seen = missing.clone();
            loader
                .on_ready_or_else("a b c", || {}, move |labels| {
                    seen.borrow_mut()
                        .extend(labels.iter().map(|l| l.as_str().to_string()))
                })
                .unwrap();

            assert_eq!(*missing.borrow(), vec!["b".to_string(), "c".to_string()]);
            assert_eq!(loader.pending_callbacks(), 1);
        })
        .await;
}

#[tokio::test]
async fn test_on_incomplete_not_called_when_ready() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            loader.request(BatchRequest::from("x").label("a")).unwrap();
            fetcher.settle("x.js");
            drain().await;

            let called = Rc::new(Cell::new(false));
            let flag = called.clone();
            loader
                .on_ready_or_else("a", || {}, move |_| flag.set(true))
                .unwrap();
            assert!(!called.get());
        })
        .await;
}

#[tokio::test]
async fn test_when_idle_is_deferred() {
    LocalSet::new()
        .run_until(async {
            let loader = Loader::new(ManualFetcher::new());
            let hits = Rc::new(Cell::new(0));

            loader.when_idle(bump(&hits));
            assert_eq!(hits.get(), 0);
            drain().await;
            assert_eq!(hits.get(), 1);
        })
        .await;
}

#[tokio::test]
async fn test_duplicate_settle_signals_are_ignored() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            let hits = Rc::new(Cell::new(0));
            loader
                .request(BatchRequest::from("x").on_complete(bump(&hits)))
                .unwrap();

            assert!(fetcher.settle("x.js"));
            assert!(!fetcher.settle("x.js"));
            drain().await;
            assert!(!fetcher.settle("x.js"));
            drain().await;

            assert_eq!(hits.get(), 1);
            let stats = loader.stats();
            assert_eq!(stats.resources_settled, 1);
            assert_eq!(stats.duplicate_settles, 2);
        })
        .await;
}

#[tokio::test]
async fn test_failed_fetch_never_fires_dependents() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            let hits = Rc::new(Cell::new(0));

            loader.on_ready("t", bump(&hits)).unwrap();
            loader
                .request(BatchRequest::from(["ok", "broken"]).label("t"))
                .unwrap();
            fetcher.settle("ok.js");
            fetcher.fail("broken.js");
            drain().await;

            assert_eq!(hits.get(), 0);
            assert_eq!(loader.state("broken"), ResourceState::Loading);
            assert!(!loader.is_complete("t"));
            // No retry
            assert_eq!(fetcher.fetch_count("broken.js"), 1);
        })
        .await;
}

#[tokio::test]
async fn test_stall_timeout_is_counted_but_late_settle_still_counts() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let config = LoaderConfig {
                stall_timeout: Some(Duration::from_millis(10)),
                ..Default::default()
            };
            let loader = Loader::with_config(fetcher.clone(), config);
            let hits = Rc::new(Cell::new(0));
            loader
                .request(BatchRequest::from("slow").on_complete(bump(&hits)))
                .unwrap();

            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(loader.stats().stalled_resources, 1);
            assert_eq!(hits.get(), 0);

            fetcher.settle("slow.js");
            drain().await;
            assert_eq!(hits.get(), 1);
            assert_eq!(loader.state("slow"), ResourceState::Loaded);
        })
        .await;
}

#[tokio::test]
async fn test_cache_buster_only_changes_fetch_url() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            loader.set_base_path("/lib/").unwrap();
            loader.set_cache_buster("v=42").unwrap();

            loader.request(["foo", "bar?x=1"]).unwrap();
            assert_eq!(
                fetcher.urls(),
                vec![
                    "/lib/foo.js?v=42".to_string(),
                    "/lib/bar.js?x=1&v=42".to_string()
                ]
            );
            assert_eq!(
                fetcher.fetched(),
                vec!["/lib/foo.js".to_string(), "/lib/bar.js?x=1".to_string()]
            );
        })
        .await;
}

#[tokio::test]
async fn test_configuration_is_set_once_before_use() {
    LocalSet::new()
        .run_until(async {
            let loader = Loader::new(ManualFetcher::new());
            loader.set_base_path("/lib/").unwrap();
            assert_eq!(
                loader.set_base_path("/other/"),
                Err(LoaderError::Config(ConfigError::BasePathAlreadySet(
                    "/lib/".to_string()
                )))
            );

            loader.set_cache_buster("v=1").unwrap();
            assert_eq!(
                loader.set_cache_buster("v=2"),
                Err(LoaderError::Config(ConfigError::CacheBusterAlreadySet(
                    "v=1".to_string()
                )))
            );

            let fresh = Loader::new(ManualFetcher::new());
            fresh.request("a").unwrap();
            assert_eq!(
                fresh.set_base_path("/lib/"),
                Err(LoaderError::Config(ConfigError::AlreadyInUse))
            );
            assert_eq!(
                fresh.set_cache_buster("v=1"),
                Err(LoaderError::Config(ConfigError::AlreadyInUse))
            );
        })
        .await;
}

#[tokio::test]
async fn test_malformed_requests_fetch_nothing() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());

            assert_eq!(
                loader.request(Vec::<String>::new()),
                Err(LoaderError::MalformedTopic(TopicError::Empty))
            );
            assert_eq!(
                loader.request(BatchRequest::from("a").label("")),
                Err(LoaderError::MalformedTopic(TopicError::EmptyLabel))
            );
            assert_eq!(
                loader.request(["a", ""]),
                Err(LoaderError::MalformedTopic(TopicError::EmptyResource))
            );
            assert_eq!(
                loader.on_ready("  ", || {}),
                Err(LoaderError::MalformedTopic(TopicError::Empty))
            );
            assert!(loader.on_ready(vec!["a|b"], || {}).is_err());
            assert_eq!(
                loader.get("", || {}),
                Err(LoaderError::MalformedTopic(TopicError::EmptyResource))
            );

            assert!(fetcher.fetched().is_empty());
            assert_eq!(loader.pending_callbacks(), 0);
            // A rejected request does not lock the configuration
            assert!(loader.set_base_path("/lib/").is_ok());
        })
        .await;
}

#[tokio::test]
async fn test_get_uses_verbatim_url_and_shares_state() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            loader.set_base_path("/lib/").unwrap();
            let hits = Rc::new(Cell::new(0));

            loader.get("/lib/app.js", bump(&hits)).unwrap();
            loader
                .request(BatchRequest::from("app").on_complete(bump(&hits)))
                .unwrap();
            assert_eq!(fetcher.fetched(), vec!["/lib/app.js".to_string()]);

            fetcher.settle("/lib/app.js");
            drain().await;
            assert_eq!(hits.get(), 2);
            assert_eq!(loader.state("/lib/app.js"), ResourceState::Loaded);
        })
        .await;
}

#[tokio::test]
async fn test_ready_future_resolves_after_completion() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            loader.request(BatchRequest::from("x").label("a")).unwrap();

            let waiter = {
                let loader = loader.clone();
                tokio::task::spawn_local(async move { loader.ready("a").await })
            };
            drain().await;
            assert!(!waiter.is_finished());

            fetcher.settle("x.js");
            let result = waiter.await.unwrap();
            assert_eq!(result, Ok(()));
        })
        .await;
}

#[tokio::test]
async fn test_callbacks_may_reenter_the_loader() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            let hits = Rc::new(Cell::new(0));

            let inner_loader = loader.clone();
            let inner_hits = hits.clone();
            loader
                .request(BatchRequest::from("base").on_complete(move || {
                    inner_loader
                        .request(BatchRequest::from("plugin").label("plugin"))
                        .unwrap();
                    inner_loader
                        .on_ready("plugin", move || inner_hits.set(inner_hits.get() + 1))
                        .unwrap();
                }))
                .unwrap();

            fetcher.settle("base.js");
            drain().await;
            assert_eq!(fetcher.fetch_count("plugin.js"), 1);

            fetcher.settle("plugin.js");
            drain().await;
            assert_eq!(hits.get(), 1);
        })
        .await;
}

#[tokio::test]
async fn test_state_of_unknown_resource() {
    LocalSet::new()
        .run_until(async {
            let loader = Loader::new(ManualFetcher::new());
            assert_eq!(loader.state("nothing"), ResourceState::Unrequested);
        })
        .await;
}
