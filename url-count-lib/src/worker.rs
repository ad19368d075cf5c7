//! Fetch-and-count worker.
//!
//! One call to [`CountWorker::process`] handles one work item: fetch the URL,
//! count the pattern in the body, and hand back a [`CountRecord`].

use crate::error::UrlCountError;
use crate::protocols::Fetch;
use crate::types::CountRecord;
use regex::bytes::Regex;
use tokio_util::sync::CancellationToken;

/// A literal substring compiled for counting inside raw bodies.
#[derive(Debug, Clone)]
pub struct Pattern {
    matcher: Regex,
}

impl Pattern {
    /// Compile a literal pattern. Empty patterns are rejected.
    pub fn new(literal: &str) -> Result<Self, UrlCountError> {
        if literal.is_empty() {
            return Err(UrlCountError::config("Pattern cannot be empty"));
        }

        let matcher = Regex::new(&regex::escape(literal))?;
        Ok(Self { matcher })
    }

    /// Count non-overlapping occurrences, scanning left to right.
    pub fn count(&self, haystack: &[u8]) -> usize {
        self.matcher.find_iter(haystack).count()
    }
}

/// Runs fetch-and-count for a single URL.
///
/// The abort token is raced against the fetch; when it fires the request
/// future is dropped and the worker returns [`UrlCountError::Cancelled`].
pub struct CountWorker<F> {
    fetcher: F,
    pattern: Pattern,
    abort: CancellationToken,
}

impl<F: Fetch> CountWorker<F> {
    pub fn new(fetcher: F, pattern: Pattern, abort: CancellationToken) -> Self {
        Self {
            fetcher,
            pattern,
            abort,
        }
    }

    pub async fn process(&self, url: &str) -> Result<CountRecord, UrlCountError> {
        let body = tokio::select! {
            biased;
            _ = self.abort.cancelled() => return Err(UrlCountError::cancelled(url)),
            body = self.fetcher.fetch(url) => body?,
        };

        Ok(CountRecord::new(url, self.pattern.count(&body)))
    }
}
