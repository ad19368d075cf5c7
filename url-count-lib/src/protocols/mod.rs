//! Transport implementations for fetching URLs.
//!
//! The pipeline only needs "give me the body of this URL". That capability
//! is the [`Fetch`] trait; the HTTP implementation lives in [`http`].

use crate::error::UrlCountError;
use async_trait::async_trait;
use std::sync::Arc;

/// HTTP GET over reqwest
pub mod http;

pub use http::HttpFetcher;

/// Fetches the full body of a URL.
///
/// Any failure to connect, send, or read the body is an error. Status codes
/// are not inspected; a 404 page is a body like any other.
#[async_trait]
pub trait Fetch: Send + Sync + 'static {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, UrlCountError>;
}

#[async_trait]
impl<F: Fetch + ?Sized> Fetch for Arc<F> {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, UrlCountError> {
        (**self).fetch(url).await
    }
}
