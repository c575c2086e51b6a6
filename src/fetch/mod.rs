//! Page and artifact fetching.
//!
//! This module defines the [`Fetcher`] trait that every fetch backend
//! implements. The pipeline only ever sees [`FetchResult`] values; a fetcher
//! never raises. Plain HTTP fetching ships as [`HttpFetcher`]; a
//! browser-automation backend would be another implementation of the same
//! trait, selected through `fetch.fetcher` in the configuration.

mod http;
pub mod mock;
mod retry;

pub use http::HttpFetcher;
pub use mock::MockFetcher;
pub use retry::{backoff_delay, RetryConfig};

use async_trait::async_trait;

use crate::models::FetchResult;

/// Errors that can occur while constructing a fetcher
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The underlying HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// The configuration named an unknown fetcher implementation
    #[error("unknown fetcher implementation: {0}")]
    UnknownBackend(String),
}

/// A fetch backend.
///
/// `fetch` is total: DNS failures, refused connections, timeouts, and non-2xx
/// statuses all map onto a [`FetchResult`] with a non-success status. Retry
/// of transient failures happens inside the implementation.
#[async_trait]
pub trait Fetcher: Send + Sync + std::fmt::Debug {
    /// Retrieve the raw bytes behind a URL
    async fn fetch(&self, url: &str) -> FetchResult;
}
