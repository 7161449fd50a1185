//! Ordered loading: each step is fetched only after the previous one loaded.

use std::cell::Cell;
use std::rc::Rc;

use script_loader::{Loader, ManualFetcher, OrderedRequest, ResourceState};
use tokio::task::LocalSet;

mod helpers;
use helpers::{bump, drain};

#[tokio::test]
async fn test_steps_are_fetched_in_order() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            let hits = Rc::new(Cell::new(0));

            loader
                .request_ordered(OrderedRequest::new(["a", "b", "c"]).on_complete(bump(&hits)))
                .unwrap();
            drain().await;
            assert_eq!(fetcher.fetched(), vec!["a.js".to_string()]);

            fetcher.settle("a.js");
            drain().await;
            assert_eq!(fetcher.fetched(), vec!["a.js".to_string(), "b.js".to_string()]);

            fetcher.settle("b.js");
            drain().await;
            assert_eq!(fetcher.fetch_count("c.js"), 1);
            assert_eq!(hits.get(), 0);

            fetcher.settle("c.js");
            drain().await;
            assert_eq!(hits.get(), 1);
        })
        .await;
}

#[tokio::test]
async fn test_stalled_step_stops_the_chain() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            let hits = Rc::new(Cell::new(0));

            loader
                .request_ordered(OrderedRequest::new(["p", "q"]).on_complete(bump(&hits)))
                .unwrap();
            drain().await;
            drain().await;

            assert_eq!(fetcher.fetched(), vec!["p.js".to_string()]);
            assert_eq!(loader.state("q"), ResourceState::Unrequested);
            assert_eq!(hits.get(), 0);
        })
        .await;
}

#[tokio::test]
async fn test_nested_steps_load_in_parallel_within_a_step() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());

            loader
                .request_ordered(
                    OrderedRequest::from_steps(vec![vec!["base"], vec!["plugin-a", "plugin-b"]])
                        .label("plugins"),
                )
                .unwrap();
            fetcher.settle("base.js");
            drain().await;
            assert_eq!(
                fetcher.fetched(),
                vec![
                    "base.js".to_string(),
                    "plugin-a.js".to_string(),
                    "plugin-b.js".to_string()
                ]
            );

            fetcher.settle("plugin-b.js");
            drain().await;
            assert!(!loader.is_complete("plugins"));

            fetcher.settle("plugin-a.js");
            drain().await;
            assert!(loader.is_complete("plugins"));
            // Intermediate steps are labeled by their identifiers
            assert!(loader.is_complete("base.js"));
        })
        .await;
}

#[tokio::test]
async fn test_ordered_step_already_loaded_continues() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());
            loader.request("base").unwrap();
            fetcher.settle("base.js");
            drain().await;

            loader
                .request_ordered(OrderedRequest::new(["base", "plugin"]).label("done"))
                .unwrap();
            drain().await;
            assert_eq!(fetcher.fetch_count("base.js"), 1);
            assert_eq!(fetcher.fetch_count("plugin.js"), 1);

            fetcher.settle("plugin.js");
            drain().await;
            assert!(loader.is_complete("done"));
        })
        .await;
}

#[tokio::test]
async fn test_invalid_step_rejects_whole_chain() {
    LocalSet::new()
        .run_until(async {
            let fetcher = ManualFetcher::new();
            let loader = Loader::new(fetcher.clone());

            assert!(loader
                .request_ordered(OrderedRequest::from_steps(vec![vec!["a"], vec![""]]))
                .is_err());
            assert!(loader
                .request_ordered(OrderedRequest::new(["a"]).label("bad label"))
                .is_err());
            assert!(fetcher.fetched().is_empty());
        })
        .await;
}
