//! HTTP implementation of the fetch primitive.

use std::sync::Arc;

use log::debug;

use crate::error_handling::FetchError;

use super::fetch::{FetchRequest, ResourceFetcher, Settler};

/// Fetches resources with a shared `reqwest::Client`.
///
/// Each fetch runs on its own local task and settles once the body has been
/// read with a success status. Failures are logged at debug level and never
/// settle; there is no retry.
///
/// Must be used from inside a Tokio `LocalSet`.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Arc<reqwest::Client>,
}

impl HttpFetcher {
    /// Creates a fetcher around an existing client.
    pub fn new(client: Arc<reqwest::Client>) -> Self {
        HttpFetcher { client }
    }
}

/// Downloads `url`, returning the body size.
async fn download(client: &reqwest::Client, url: &str) -> Result<usize, FetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    let body = response.bytes().await?;
    Ok(body.len())
}

impl ResourceFetcher for HttpFetcher {
    fn fetch(&self, request: FetchRequest, settler: Settler) {
        let client = self.client.clone();
        tokio::task::spawn_local(async move {
            match download(&client, &request.url).await {
                Ok(size) => {
                    debug!("Fetched {} ({} bytes)", request.url, size);
                    settler.settle();
                }
                Err(e) => {
                    debug!("Failed to fetch script {}: {}", request.url, e);
                }
            }
        });
    }
}
