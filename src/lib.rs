//! script_loader library: asynchronous resource-dependency loading
//!
//! This library fetches script resources at most once each, tracks their
//! loading state, and runs callbacks once named batches of resources
//! ("topics") have all loaded, optionally in a strict order.
//!
//! # Example
//!
//! ```no_run
//! use script_loader::{BatchRequest, Loader, ManualFetcher, OrderedRequest};
//!
//! # async fn example() -> Result<(), script_loader::LoaderError> {
//! let local = tokio::task::LocalSet::new();
//! local
//!     .run_until(async {
//!         let fetcher = ManualFetcher::new();
//!         let loader = Loader::new(fetcher.clone());
//!         loader.set_base_path("https://cdn.example.com/js/")?;
//!
//!         // jquery first, then its plugin
//!         loader.request_ordered(OrderedRequest::new(["jquery", "jquery.ui"]).label("ui"))?;
//!         loader.request(BatchRequest::from("analytics").label("stats"))?;
//!         loader.on_ready("ui stats", || println!("page decorations ready"))?;
//!         Ok(())
//!     })
//!     .await
//! # }
//! ```
//!
//! # Requirements
//!
//! The loader spawns its tasks with `tokio::task::spawn_local`, so every
//! loader operation must run inside a Tokio `LocalSet`.

#![warn(missing_docs)]

pub mod config;
mod error_handling;
pub mod initialization;
mod loader;

// Re-export public API
pub use config::{LoaderConfig, LogFormat, LogLevel};
pub use error_handling::{
    ConfigError, FetchError, InitializationError, LoaderError, LoaderEvent, StatsSnapshot,
    TopicError,
};
pub use loader::{
    has_extension, is_absolute, normalize, BatchRequest, Callback, DependencyKey, FetchRequest,
    HttpFetcher, IntoTopics, Loader, ManualFetcher, OrderedRequest, ResourceFetcher,
    ResourceId, ResourceState, Settler, TopicLabel,
};
