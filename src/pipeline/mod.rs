//! Pipeline orchestration.
//!
//! Wires Fetcher → Extractor → RangeDownloader → ReportBuilder behind one
//! `run` call. Only validation and configuration problems fail a run; every
//! per-item failure is captured in the sealed result's outcome and
//! skipped-entry counts.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::Config;
use crate::download::{RangeDownloader, RangeError};
use crate::extract::{DetailExtractor, ExtractError, ListingExtractor};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::models::{PaperRecord, PipelineResult, ReportBundle};
use crate::progress::{NullObserver, ProgressEvent, ProgressObserver};
use crate::report::{ReportBuilder, ReportError};

/// States of one pipeline run. `Failed` is absorbing and reachable only from
/// validation or configuration errors, never from per-item failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Created, not yet running
    Idle,
    /// Retrieving the listing and detail pages
    FetchingListing,
    /// Turning fetched HTML into records
    Extracting,
    /// Bulk-fetching the requested identifier range
    Downloading,
    /// Serializing output artifacts
    Reporting,
    /// Run finished; result sealed
    Done,
    /// Unrecoverable configuration or validation error
    Failed,
}

/// Errors that halt a pipeline run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Bad job parameters; raised before any network call
    #[error("validation error: {0}")]
    Validation(String),

    /// Fetch backend could not be constructed
    #[error(transparent)]
    Fetch(#[from] crate::fetch::FetchError),

    /// Configured selectors failed to compile
    #[error(transparent)]
    Selectors(ExtractError),

    /// Output serialization failed
    #[error(transparent)]
    Report(#[from] ReportError),
}

impl From<RangeError> for PipelineError {
    fn from(err: RangeError) -> Self {
        PipelineError::Validation(err.to_string())
    }
}

/// What a run should do. At least one of the three inputs must be present.
#[derive(Debug, Clone, Default)]
pub struct PipelineJob {
    /// Listing page to scrape; `None` skips the listing
    pub listing_url: Option<String>,
    /// Detail pages to scrape individually
    pub detail_urls: Vec<String>,
    /// Inclusive identifier range to bulk-download
    pub range: Option<(u32, u32)>,
}

impl PipelineJob {
    /// Scrape one listing page
    pub fn listing(url: impl Into<String>) -> Self {
        Self {
            listing_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Bulk-download an inclusive identifier range
    pub fn range(start: u32, end: u32) -> Self {
        Self {
            range: Some((start, end)),
            ..Self::default()
        }
    }

    /// Scrape a listing and download a range in one run
    pub fn full(url: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            listing_url: Some(url.into()),
            detail_urls: Vec::new(),
            range: Some((start, end)),
        }
    }
}

/// Everything a run hands back to the caller
#[derive(Debug)]
pub struct PipelineOutput {
    /// Sealed records, outcomes, and counts
    pub result: PipelineResult,
    /// Serialized output artifacts
    pub bundle: ReportBundle,
}

/// Orchestrates one or more runs over a fetch backend.
///
/// The fetcher is acquired when the pipeline is built and dropped with it,
/// so backends holding real resources (a browser session, say) are released
/// on every path out of a run.
pub struct Pipeline {
    config: Config,
    fetcher: Arc<dyn Fetcher>,
    observer: Arc<dyn ProgressObserver>,
    cancel: CancellationToken,
    state: Mutex<PipelineState>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("state", &self.state())
            .field("fetcher", &self.fetcher)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline with the fetch backend named in the configuration
    pub fn new(config: Config) -> Result<Self, PipelineError> {
        let fetcher: Arc<dyn Fetcher> = match config.fetch.fetcher.as_str() {
            "http" => Arc::new(HttpFetcher::new(&config.fetch, &config.rate_limits)?),
            other => {
                return Err(PipelineError::Fetch(
                    crate::fetch::FetchError::UnknownBackend(other.to_string()),
                ))
            }
        };
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Build a pipeline over an explicit fetch backend
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            config,
            fetcher,
            observer: Arc::new(NullObserver),
            cancel: CancellationToken::new(),
            state: Mutex::new(PipelineState::Idle),
        }
    }

    /// Attach a progress observer
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Token the caller can use to request a cooperative stop
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current state of the most recent run
    pub fn state(&self) -> PipelineState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, next: PipelineState) {
        let mut guard = self.state.lock().unwrap();
        tracing::debug!(from = ?*guard, to = ?next, "pipeline state transition");
        *guard = next;
    }

    /// Execute one job to completion.
    ///
    /// Validation happens before any network call; a validation failure
    /// leaves the source untouched. After that point every per-item failure
    /// is recorded and the run always seals a complete result.
    pub async fn run(&self, job: PipelineJob) -> Result<PipelineOutput, PipelineError> {
        match self.run_inner(job).await {
            Ok(output) => {
                self.set_state(PipelineState::Done);
                Ok(output)
            }
            Err(err) => {
                self.set_state(PipelineState::Failed);
                Err(err)
            }
        }
    }

    async fn run_inner(&self, job: PipelineJob) -> Result<PipelineOutput, PipelineError> {
        self.set_state(PipelineState::Idle);
        self.validate(&job)?;

        // Selector problems are configuration errors; surface them before
        // the first fetch.
        let listing_extractor = ListingExtractor::new(&self.config.selectors)
            .map_err(PipelineError::Selectors)?;
        let detail_extractor =
            DetailExtractor::new(&self.config.selectors).map_err(PipelineError::Selectors)?;

        let mut records: Vec<PaperRecord> = Vec::new();
        let mut skipped = 0usize;

        // Listing and detail pages
        self.set_state(PipelineState::FetchingListing);
        let mut pages: Vec<String> = Vec::new();
        if let Some(url) = &job.listing_url {
            if !self.cancel.is_cancelled() {
                let fetched = self.fetcher.fetch(url).await;
                self.observer
                    .on_progress(ProgressEvent::page(url.clone(), fetched.is_success()));
                match fetched.bytes {
                    Some(bytes) => pages.push(String::from_utf8_lossy(&bytes).into_owned()),
                    None => {
                        tracing::warn!(%url, "listing fetch failed; continuing without records");
                        skipped += 1;
                    }
                }
            }
        }

        self.set_state(PipelineState::Extracting);
        for html in &pages {
            match listing_extractor.extract(html, job.listing_url.as_deref().unwrap_or("")) {
                Ok(extraction) => {
                    skipped += extraction.skipped;
                    records.extend(extraction.records);
                }
                Err(err) => {
                    // Markup drift on one page is an operational event, not
                    // a run failure.
                    tracing::warn!(error = %err, "listing extraction failed");
                    skipped += 1;
                }
            }
        }

        for url in &job.detail_urls {
            if self.cancel.is_cancelled() {
                break;
            }
            let fetched = self.fetcher.fetch(url).await;
            self.observer
                .on_progress(ProgressEvent::page(url.clone(), fetched.is_success()));
            let Some(bytes) = fetched.bytes else {
                skipped += 1;
                continue;
            };
            match detail_extractor.extract(&String::from_utf8_lossy(&bytes), url) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(%url, error = %err, "detail extraction failed, skipped");
                    skipped += 1;
                }
            }
        }

        // Identifier range
        self.set_state(PipelineState::Downloading);
        let (outcomes, artifacts) = match job.range {
            Some((start, end)) => {
                let downloader = RangeDownloader::new(
                    Arc::clone(&self.fetcher),
                    self.config.rate_limits.concurrency,
                    self.cancel.clone(),
                );
                let download = downloader
                    .download_range(start, end, |id| self.config.source.pdf_url(id), self.observer.as_ref())
                    .await?;
                (download.outcomes, download.artifacts)
            }
            None => (Vec::new(), Vec::new()),
        };

        self.set_state(PipelineState::Reporting);
        let builder = ReportBuilder::new(self.config.source.clone());
        let bundle = builder.build(&records, &outcomes, &artifacts)?;

        let result = PipelineResult::seal(records, outcomes, skipped);
        tracing::info!(
            records = result.records.len(),
            succeeded = result.succeeded,
            failed = result.failed,
            skipped = result.skipped_entries,
            "pipeline run complete"
        );

        Ok(PipelineOutput { result, bundle })
    }

    /// Reject bad jobs before any work starts
    fn validate(&self, job: &PipelineJob) -> Result<(), PipelineError> {
        if job.listing_url.is_none() && job.detail_urls.is_empty() && job.range.is_none() {
            return Err(PipelineError::Validation(
                "job names no listing, no detail pages, and no range".to_string(),
            ));
        }
        for url in job.listing_url.iter().chain(job.detail_urls.iter()) {
            Url::parse(url)
                .map_err(|e| PipelineError::Validation(format!("invalid URL {url:?}: {e}")))?;
        }
        if let Some((start, end)) = job.range {
            RangeDownloader::validate_range(start, end)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockFetcher;
    use crate::models::DownloadStatus;
    use crate::progress::CollectingObserver;

    fn pipeline_with(fetcher: Arc<MockFetcher>) -> Pipeline {
        Pipeline::with_fetcher(Config::default(), fetcher)
    }

    fn pdf_url(id: u32) -> String {
        Config::default().source.pdf_url(id)
    }

    #[tokio::test]
    async fn test_empty_job_is_validation_error() {
        let fetcher = Arc::new(MockFetcher::new());
        let pipeline = pipeline_with(Arc::clone(&fetcher));
        let err = pipeline.run(PipelineJob::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_bad_range_fails_before_any_fetch() {
        let fetcher = Arc::new(MockFetcher::new());
        let pipeline = pipeline_with(Arc::clone(&fetcher));

        let err = pipeline.run(PipelineJob::range(0, 5)).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(fetcher.call_count(), 0);

        let err = pipeline.run(PipelineJob::range(9, 3)).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_range_run_with_partial_failure() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.script_success(&pdf_url(33405), b"%PDF-1.4 a".to_vec());
        fetcher.script_success(&pdf_url(33406), b"%PDF-1.4 b".to_vec());
        fetcher.script_status(&pdf_url(33407), 404);

        let observer = Arc::new(CollectingObserver::new());
        let pipeline = pipeline_with(fetcher).with_observer(Arc::clone(&observer) as _);

        let output = pipeline.run(PipelineJob::range(33405, 33407)).await.unwrap();
        assert_eq!(pipeline.state(), PipelineState::Done);

        let result = &output.result;
        assert_eq!(result.outcomes.len(), 3);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.outcomes[2].status, DownloadStatus::Failed);
        assert_eq!(result.outcomes[2].byte_size, None);

        // archive holds exactly the two downloaded artifacts
        let archive_bytes = output.bundle.archive_bytes.clone().unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(archive_bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        assert_eq!(observer.events().len(), 3);
    }

    #[tokio::test]
    async fn test_listing_run_produces_records_and_table() {
        let listing_url = "https://www.nber.org/papers?page=1";
        let html = r#"<html><body><div class="promo-grid__promos">
            <div class="digest-card">
                <div class="digest-card__title">Alpha: Beta</div>
                <span class="digest-card__label">May 2025</span>
                <a class="paper-card__paper_number" href="/papers/w1">w1</a>
                <div class="digest-card__items">Author(s) - A. Uthor</div>
            </div>
        </div></body></html>"#;

        let fetcher = Arc::new(MockFetcher::new());
        fetcher.script_success(listing_url, html.as_bytes().to_vec());

        let pipeline = pipeline_with(fetcher);
        let output = pipeline.run(PipelineJob::listing(listing_url)).await.unwrap();

        assert_eq!(output.result.records.len(), 1);
        assert_eq!(output.result.records[0].identifier, "1");
        assert!(output.bundle.archive_bytes.is_none());

        let table = String::from_utf8(output.bundle.tabular_bytes.clone()).unwrap();
        assert!(table.contains("NBERWP 1"));
    }

    #[tokio::test]
    async fn test_listing_fetch_failure_is_not_fatal() {
        let listing_url = "https://www.nber.org/papers?page=1";
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.script_status(listing_url, 503);

        let pipeline = pipeline_with(fetcher);
        let output = pipeline.run(PipelineJob::listing(listing_url)).await.unwrap();

        assert_eq!(pipeline.state(), PipelineState::Done);
        assert!(output.result.records.is_empty());
        assert_eq!(output.result.skipped_entries, 1);
    }

    #[tokio::test]
    async fn test_detail_pages_append_records() {
        let detail_url = "https://www.nber.org/papers/w42";
        let html = r#"<html><head>
            <meta name="citation_title" content="Deep Dive">
            <meta name="citation_author" content="D. Epth">
            <meta name="citation_doi" content="10.3386/w42">
        </head><body></body></html>"#;

        let fetcher = Arc::new(MockFetcher::new());
        fetcher.script_success(detail_url, html.as_bytes().to_vec());

        let pipeline = pipeline_with(fetcher);
        let job = PipelineJob {
            detail_urls: vec![detail_url.to_string()],
            ..PipelineJob::default()
        };
        let output = pipeline.run(job).await.unwrap();

        assert_eq!(output.result.records.len(), 1);
        assert_eq!(output.result.records[0].doi.as_deref(), Some("10.3386/w42"));
    }

    #[tokio::test]
    async fn test_rerun_is_byte_identical() {
        let listing_url = "https://www.nber.org/papers?page=1";
        let html = r#"<html><body><div class="promo-grid__promos">
            <div class="digest-card">
                <div class="digest-card__title">Stable Output</div>
                <span class="digest-card__label">2024</span>
                <a class="paper-card__paper_number" href="/papers/w2">w2</a>
                <div class="digest-card__items">Author(s) - B. Yte</div>
            </div>
        </div></body></html>"#;

        let fetcher = Arc::new(MockFetcher::new());
        fetcher.script_success(listing_url, html.as_bytes().to_vec());
        let pipeline = pipeline_with(fetcher);

        let first = pipeline.run(PipelineJob::listing(listing_url)).await.unwrap();
        let second = pipeline.run(PipelineJob::listing(listing_url)).await.unwrap();
        assert_eq!(first.bundle.tabular_bytes, second.bundle.tabular_bytes);
    }

    #[tokio::test]
    async fn test_unknown_backend_is_config_error() {
        let mut config = Config::default();
        config.fetch.fetcher = "carrier-pigeon".to_string();
        let err = Pipeline::new(config).unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(_)));
    }
}
