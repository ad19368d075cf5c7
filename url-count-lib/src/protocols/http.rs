//! HTTP fetcher backed by reqwest.
//!
//! Issues a plain GET and reads the whole body. There is no client timeout:
//! an in-flight request only ends early when the pipeline aborts and drops
//! the future.

use crate::error::UrlCountError;
use crate::protocols::Fetch;
use async_trait::async_trait;
use tracing::debug;

const USER_AGENT: &str = concat!("url-count/", env!("CARGO_PKG_VERSION"));

/// Production [`Fetch`] implementation.
#[derive(Clone)]
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with a fresh connection pool.
    pub fn new() -> Result<Self, UrlCountError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                UrlCountError::internal(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, UrlCountError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| UrlCountError::network(url, format!("Request failed: {}", e)))?;

        debug!(url, status = %response.status(), "response received");

        let body = response
            .bytes()
            .await
            .map_err(|e| UrlCountError::body(url, e.to_string()))?;

        Ok(body.to_vec())
    }
}
