//! HTTP client initialization.
//!
//! Builds the `reqwest::Client` used by `HttpFetcher` to download scripts.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Opt;
use reqwest::ClientBuilder;

/// Initializes the HTTP client used for script fetches.
///
/// Creates a `reqwest::Client` configured with:
/// - User-Agent header from options
/// - Per-request timeout from options
/// - Redirect following (reqwest default of 10 hops)
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_client(opt: &Opt) -> Result<Arc<reqwest::Client>, reqwest::Error> {
    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(opt.fetch_timeout_seconds))
        .user_agent(opt.user_agent.clone())
        .build()?;
    Ok(Arc::new(client))
}
