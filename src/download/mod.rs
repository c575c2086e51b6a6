//! Bulk artifact download over a numeric identifier range.

use std::sync::Arc;

use futures_util::{stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::fetch::Fetcher;
use crate::models::{DownloadOutcome, FetchStatus};
use crate::progress::{ProgressEvent, ProgressObserver};

/// PDF files open with this magic
const PDF_MAGIC: &[u8] = b"%PDF";

/// Errors from range validation
#[derive(Debug, thiserror::Error)]
pub enum RangeError {
    /// Identifiers start at 1
    #[error("range start must be at least 1, got {0}")]
    StartBelowOne(u32),

    /// End precedes start
    #[error("range end {end} precedes start {start}")]
    EndBeforeStart {
        /// Requested start
        start: u32,
        /// Requested end
        end: u32,
    },
}

/// A successfully fetched and validated artifact
#[derive(Debug, Clone)]
pub struct FetchedArtifact {
    /// Identifier the artifact belongs to
    pub identifier: u32,
    /// Raw fetched bytes
    pub bytes: Vec<u8>,
}

/// Result of a range download
#[derive(Debug)]
pub struct RangeDownload {
    /// One outcome per requested identifier, in requested order
    pub outcomes: Vec<DownloadOutcome>,
    /// Payloads for the downloaded identifiers, in requested order
    pub artifacts: Vec<FetchedArtifact>,
}

/// Fetches every identifier in an inclusive range through a [`Fetcher`].
///
/// A bounded worker pool fetches distinct identifiers in parallel; the shared
/// rate limiter lives inside the fetcher, so adding workers never raises the
/// request rate. Results land in an index-addressed slot per identifier, so
/// no lock is held across a network call and ordering is preserved. One
/// failed identifier never aborts the rest of the range.
#[derive(Debug, Clone)]
pub struct RangeDownloader {
    fetcher: Arc<dyn Fetcher>,
    concurrency: usize,
    cancel: CancellationToken,
}

impl RangeDownloader {
    /// Create a downloader over a fetch backend
    pub fn new(fetcher: Arc<dyn Fetcher>, concurrency: usize, cancel: CancellationToken) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
            cancel,
        }
    }

    /// Validate a requested range without issuing any network calls
    pub fn validate_range(start: u32, end: u32) -> Result<(), RangeError> {
        if start < 1 {
            return Err(RangeError::StartBelowOne(start));
        }
        if end < start {
            return Err(RangeError::EndBeforeStart { start, end });
        }
        Ok(())
    }

    /// Download `[start, end]` inclusive.
    ///
    /// `id_to_url` is a pure mapping from identifier to source URL. Exactly
    /// one [`DownloadOutcome`] is produced per requested identifier; after a
    /// cancellation, identifiers that never started are recorded as failed
    /// with a "cancelled" detail rather than dropped.
    pub async fn download_range<F>(
        &self,
        start: u32,
        end: u32,
        id_to_url: F,
        observer: &dyn ProgressObserver,
    ) -> Result<RangeDownload, RangeError>
    where
        F: Fn(u32) -> String + Send + Sync,
    {
        Self::validate_range(start, end)?;

        let total = (end - start + 1) as usize;
        let mut outcome_slots: Vec<Option<DownloadOutcome>> = vec![None; total];
        let mut payload_slots: Vec<Option<Vec<u8>>> = vec![None; total];

        tracing::info!(start, end, total, "range download starting");

        let mut results = stream::iter((start..=end).enumerate().map(|(index, identifier)| {
            let fetcher = Arc::clone(&self.fetcher);
            let cancel = self.cancel.clone();
            let url = id_to_url(identifier);
            async move {
                // Checked when the worker picks the item up, so a stop
                // request finishes in-flight items and starts nothing new.
                if cancel.is_cancelled() {
                    return (index, DownloadOutcome::failed(identifier, "cancelled"), None);
                }
                let (outcome, payload) = fetch_one(fetcher.as_ref(), identifier, &url).await;
                (index, outcome, payload)
            }
        }))
        .buffer_unordered(self.concurrency);

        while let Some((index, outcome, payload)) = results.next().await {
            observer.on_progress(ProgressEvent::identifier(outcome.identifier, outcome.status));
            outcome_slots[index] = Some(outcome);
            payload_slots[index] = payload;
        }
        drop(results);

        let outcomes: Vec<DownloadOutcome> = outcome_slots
            .into_iter()
            .zip(start..=end)
            .map(|(slot, identifier)| {
                slot.unwrap_or_else(|| DownloadOutcome::failed(identifier, "worker produced no result"))
            })
            .collect();

        let artifacts: Vec<FetchedArtifact> = payload_slots
            .into_iter()
            .zip(start..=end)
            .filter_map(|(payload, identifier)| {
                payload.map(|bytes| FetchedArtifact { identifier, bytes })
            })
            .collect();

        let downloaded = artifacts.len();
        tracing::info!(downloaded, failed = total - downloaded, "range download finished");

        Ok(RangeDownload { outcomes, artifacts })
    }
}

/// Fetch and validate one identifier
async fn fetch_one(
    fetcher: &dyn Fetcher,
    identifier: u32,
    url: &str,
) -> (DownloadOutcome, Option<Vec<u8>>) {
    let result = fetcher.fetch(url).await;

    if !result.is_success() {
        let detail = result
            .error_detail
            .unwrap_or_else(|| describe_status(&result.status));
        return (DownloadOutcome::failed(identifier, detail), None);
    }

    let bytes = result.bytes.unwrap_or_default();
    if !bytes.starts_with(PDF_MAGIC) {
        // Soft-404s and HTML error pages would corrupt the archive
        return (
            DownloadOutcome::failed(identifier, "payload is not a PDF document"),
            None,
        );
    }

    let pages = page_count(&bytes);
    let outcome = DownloadOutcome::downloaded(identifier, bytes.len() as u64, pages);
    (outcome, Some(bytes))
}

fn describe_status(status: &FetchStatus) -> String {
    match status {
        FetchStatus::Success => "success".to_string(),
        FetchStatus::HttpError(code) => format!("HTTP {code}"),
        FetchStatus::NetworkError => "network error".to_string(),
        FetchStatus::Timeout => "timeout".to_string(),
    }
}

/// Best-effort page count; malformed PDFs just report no count
fn page_count(bytes: &[u8]) -> Option<usize> {
    lopdf::Document::load_mem(bytes)
        .ok()
        .map(|doc| doc.get_pages().len())
}
