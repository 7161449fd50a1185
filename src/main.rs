//! Main application entry point (CLI binary).
//!
//! A thin wrapper around the `script_loader` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - User-facing output formatting
//!
//! Resources are fetched over HTTP through the dependency loader, either in
//! parallel or one after another (`--ordered`).

use std::cell::Cell;
use std::process;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tokio::task::LocalSet;

use script_loader::config::Opt;
use script_loader::initialization::{init_client, init_logger_with};
use script_loader::{
    BatchRequest, HttpFetcher, Loader, LoaderConfig, OrderedRequest, ResourceState,
};

const BATCH_LABEL: &str = "cli";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let opt = Opt::parse();

    init_logger_with(opt.log_level.clone().into(), opt.log_format.clone())
        .context("Failed to initialize logger")?;

    let local = LocalSet::new();
    match local.run_until(run(opt)).await {
        Ok(true) => Ok(()),
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("script_loader error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Loads every resource and returns whether all of them arrived in time.
async fn run(opt: Opt) -> Result<bool> {
    let client = init_client(&opt).context("Failed to initialize HTTP client")?;
    let loader = Loader::with_config(HttpFetcher::new(client), LoaderConfig::from(&opt));
    let label = opt.label.clone().unwrap_or_else(|| BATCH_LABEL.to_string());

    let started = Instant::now();
    let done = Rc::new(Cell::new(false));
    let flag = done.clone();

    if opt.ordered {
        loader
            .request_ordered(
                OrderedRequest::new(opt.resources.clone())
                    .label(label.clone())
                    .on_complete(move || flag.set(true)),
            )
            .context("Invalid ordered request")?;
    } else {
        loader
            .request(
                BatchRequest::new(opt.resources.clone())
                    .label(label.clone())
                    .on_complete(move || flag.set(true)),
            )
            .context("Invalid request")?;
    }

    let limit = Duration::from_secs(opt.timeout_seconds);
    let finished = tokio::time::timeout(limit, loader.ready(label.as_str()))
        .await
        .is_ok();

    let stats = loader.stats();
    info!(
        "{} fetches issued, {} deduplicated, {} settled",
        stats.fetches_issued, stats.duplicate_requests, stats.resources_settled
    );

    if finished && done.get() {
        println!(
            "Loaded {} resource{} in {:.1}s",
            opt.resources.len(),
            if opt.resources.len() == 1 { "" } else { "s" },
            started.elapsed().as_secs_f64()
        );
        return Ok(true);
    }

    for resource in &opt.resources {
        let state = loader.state(resource);
        if state != ResourceState::Loaded {
            println!("{}: {}", resource, state);
        }
    }
    eprintln!(
        "Gave up after {}s: not every resource settled",
        opt.timeout_seconds
    );
    Ok(false)
}
