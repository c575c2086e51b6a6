//! Mock fetcher for testing purposes.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::{FetchResult, FetchStatus};

use super::Fetcher;

/// A mock fetcher that serves scripted responses keyed by URL.
///
/// Unscripted URLs answer HTTP 404. Every request is logged so tests can
/// assert on call counts and ordering.
#[derive(Debug, Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, FetchResult>>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    /// Create a mock with no scripted responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful response for a URL
    pub fn script_success(&self, url: &str, bytes: Vec<u8>) {
        self.script(url, FetchResult::success(url, bytes));
    }

    /// Script an HTTP error status for a URL
    pub fn script_status(&self, url: &str, status: u16) {
        self.script(
            url,
            FetchResult::failure(url, FetchStatus::HttpError(status), format!("HTTP {status}")),
        );
    }

    /// Script an arbitrary response for a URL
    pub fn script(&self, url: &str, result: FetchResult) {
        let mut guard = self.responses.lock().unwrap();
        guard.insert(url.to_string(), result);
    }

    /// URLs requested so far, in request order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests made
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        self.calls.lock().unwrap().push(url.to_string());
        let guard = self.responses.lock().unwrap();
        match guard.get(url) {
            Some(result) => result.clone(),
            None => FetchResult::failure(url, FetchStatus::HttpError(404), "HTTP 404 (unscripted)"),
        }
    }
}
