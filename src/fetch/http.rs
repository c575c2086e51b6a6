//! Plain HTTP fetcher over reqwest, with shared rate limiting and retry.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use tokio::time::sleep;

use crate::config::{FetchConfig, RateLimitConfig};
use crate::models::{FetchResult, FetchStatus};

use super::retry::{backoff_delay, RetryConfig};
use super::{FetchError, Fetcher};

/// HTTP fetch backend.
///
/// One instance is shared by every worker in a pipeline run; the token-bucket
/// limiter inside it throttles the whole run, not individual workers.
pub struct HttpFetcher {
    client: Client,
    limiter: Arc<DefaultDirectRateLimiter>,
    retry: RetryConfig,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Outcome of a single attempt, before the retry policy has run
enum AttemptFailure {
    Timeout(String),
    Network(String),
    Http(u16, String),
}

impl AttemptFailure {
    /// Timeouts, connection failures, and 5xx/429 responses are worth
    /// retrying; other HTTP statuses are permanent.
    fn is_transient(&self) -> bool {
        match self {
            AttemptFailure::Timeout(_) | AttemptFailure::Network(_) => true,
            AttemptFailure::Http(status, _) => *status >= 500 || *status == 429,
        }
    }

    fn into_result(self, url: &str) -> FetchResult {
        match self {
            AttemptFailure::Timeout(detail) => {
                FetchResult::failure(url, FetchStatus::Timeout, detail)
            }
            AttemptFailure::Network(detail) => {
                FetchResult::failure(url, FetchStatus::NetworkError, detail)
            }
            AttemptFailure::Http(status, detail) => {
                FetchResult::failure(url, FetchStatus::HttpError(status), detail)
            }
        }
    }
}

impl HttpFetcher {
    /// Build a fetcher from the fetch and rate-limit configuration
    pub fn new(fetch: &FetchConfig, rate: &RateLimitConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(fetch.user_agent.as_str())
            .timeout(fetch.timeout())
            .connect_timeout(fetch.connect_timeout())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        let per_second =
            NonZeroU32::new(rate.requests_per_second).unwrap_or(nonzero!(1u32));
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self {
            client,
            limiter,
            retry: RetryConfig::with_max_attempts(fetch.max_attempts),
        })
    }

    /// Override the retry policy (delays are fixed by config otherwise)
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn try_fetch(&self, url: &str) -> Result<Vec<u8>, AttemptFailure> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AttemptFailure::Timeout(e.to_string())
            } else {
                AttemptFailure::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptFailure::Http(
                status.as_u16(),
                format!("HTTP {}", status),
            ));
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                AttemptFailure::Timeout(e.to_string())
            } else {
                AttemptFailure::Network(e.to_string())
            }
        })?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.limiter.until_ready().await;

            match self.try_fetch(url).await {
                Ok(bytes) => {
                    if attempt > 1 {
                        tracing::info!(url, attempt, "fetch succeeded after retry");
                    }
                    return FetchResult::success(url, bytes);
                }
                Err(failure) => {
                    if failure.is_transient() && attempt < self.retry.max_attempts {
                        let delay = backoff_delay(&self.retry, attempt);
                        tracing::debug!(
                            url,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "transient fetch failure, retrying"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(url, attempt, "fetch failed");
                    return failure.into_result(url);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_fetcher(server_rps: u32, max_attempts: u32) -> HttpFetcher {
        let fetch = FetchConfig {
            max_attempts,
            ..FetchConfig::default()
        };
        let rate = RateLimitConfig {
            requests_per_second: server_rps,
            ..RateLimitConfig::default()
        };
        HttpFetcher::new(&fetch, &rate)
            .unwrap()
            .with_retry(RetryConfig {
                max_attempts,
                initial_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(20),
                backoff_multiplier: 2.0,
            })
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/w1.pdf")
            .with_status(200)
            .with_body("%PDF-1.4 body")
            .create_async()
            .await;

        let fetcher = test_fetcher(100, 3);
        let result = fetcher.fetch(&format!("{}/w1.pdf", server.url())).await;

        mock.assert_async().await;
        assert!(result.is_success());
        assert_eq!(result.bytes.as_deref(), Some(b"%PDF-1.4 body".as_slice()));
    }

    #[tokio::test]
    async fn test_fetch_404_is_permanent_no_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing.pdf")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let fetcher = test_fetcher(100, 3);
        let result = fetcher.fetch(&format!("{}/missing.pdf", server.url())).await;

        mock.assert_async().await;
        assert_eq!(result.status, FetchStatus::HttpError(404));
        assert!(result.bytes.is_none());
    }

    #[tokio::test]
    async fn test_fetch_500_retried_then_reported() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky.pdf")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let fetcher = test_fetcher(100, 3);
        let result = fetcher.fetch(&format!("{}/flaky.pdf", server.url())).await;

        mock.assert_async().await;
        assert_eq!(result.status, FetchStatus::HttpError(500));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_maps_to_network_error() {
        // Nothing listens on this port
        let fetcher = test_fetcher(100, 1);
        let result = fetcher.fetch("http://127.0.0.1:1/never").await;
        assert_eq!(result.status, FetchStatus::NetworkError);
        assert!(result.error_detail.is_some());
    }
}
