//! Fetch, download, and pipeline result models.

use serde::{Deserialize, Serialize};

use super::PaperRecord;

/// Classification of a single fetch attempt after retries are exhausted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// 2xx response with a body
    Success,
    /// Non-2xx response with the final status code
    HttpError(u16),
    /// DNS, connection, or protocol failure
    NetworkError,
    /// Request exceeded its deadline
    Timeout,
}

/// Outcome of fetching one URL. Immutable once produced.
///
/// The fetcher never raises; every failure mode maps onto a status here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    /// URL requested
    pub url: String,

    /// Final classification after the retry policy ran
    pub status: FetchStatus,

    /// Response body, present only on success
    pub bytes: Option<Vec<u8>>,

    /// Human-readable failure detail
    pub error_detail: Option<String>,
}

impl FetchResult {
    /// Successful fetch with a body
    pub fn success(url: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            status: FetchStatus::Success,
            bytes: Some(bytes),
            error_detail: None,
        }
    }

    /// Failed fetch with a classification and detail
    pub fn failure(url: impl Into<String>, status: FetchStatus, detail: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            bytes: None,
            error_detail: Some(detail.into()),
        }
    }

    /// Whether the fetch produced a body
    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }
}

/// Terminal state of one identifier in a requested range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    /// Artifact fetched and validated
    Downloaded,
    /// Fetch failed or the payload was not the expected artifact
    Failed,
}

/// One entry per requested identifier. A failed identifier is recorded
/// explicitly, never omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadOutcome {
    /// Publisher's numeric working-paper number
    pub identifier: u32,

    /// Terminal state
    pub status: DownloadStatus,

    /// Payload size in bytes, present only on success
    pub byte_size: Option<u64>,

    /// PDF page count, present when the payload parsed as a PDF
    pub page_count: Option<usize>,

    /// Failure detail for the report's failure list
    pub error_detail: Option<String>,
}

impl DownloadOutcome {
    /// Successful download
    pub fn downloaded(identifier: u32, byte_size: u64, page_count: Option<usize>) -> Self {
        Self {
            identifier,
            status: DownloadStatus::Downloaded,
            byte_size: Some(byte_size),
            page_count,
            error_detail: None,
        }
    }

    /// Failed download with detail
    pub fn failed(identifier: u32, detail: impl Into<String>) -> Self {
        Self {
            identifier,
            status: DownloadStatus::Failed,
            byte_size: None,
            page_count: None,
            error_detail: Some(detail.into()),
        }
    }

    /// Whether the artifact was downloaded and validated
    pub fn is_downloaded(&self) -> bool {
        self.status == DownloadStatus::Downloaded
    }

    /// Archive entry name for this identifier
    pub fn file_name(&self) -> String {
        format!("w{}.pdf", self.identifier)
    }
}

/// Sealed result of one pipeline run.
///
/// Records keep discovery order; outcomes keep requested-identifier order.
/// Returned by value, so the caller holds an immutable snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Metadata records in discovery order
    pub records: Vec<PaperRecord>,

    /// One outcome per requested identifier, in requested order
    pub outcomes: Vec<DownloadOutcome>,

    /// Listing entries dropped for missing required fields
    pub skipped_entries: usize,

    /// Count of downloaded outcomes
    pub succeeded: usize,

    /// Count of failed outcomes
    pub failed: usize,
}

impl PipelineResult {
    /// Seal a result from the accumulated records and outcomes
    pub fn seal(
        records: Vec<PaperRecord>,
        outcomes: Vec<DownloadOutcome>,
        skipped_entries: usize,
    ) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_downloaded()).count();
        let failed = outcomes.len() - succeeded;
        Self {
            records,
            outcomes,
            skipped_entries,
            succeeded,
            failed,
        }
    }

    /// Failure details for identifiers that did not download
    pub fn failure_list(&self) -> Vec<&DownloadOutcome> {
        self.outcomes.iter().filter(|o| !o.is_downloaded()).collect()
    }
}

/// Serialized output artifacts built from a [`PipelineResult`]
#[derive(Debug, Clone)]
pub struct ReportBundle {
    /// CSV table of metadata records
    pub tabular_bytes: Vec<u8>,

    /// Zip of downloaded artifacts, `None` when nothing downloaded
    pub archive_bytes: Option<Vec<u8>>,

    /// CSV page-count report, `None` when nothing downloaded
    pub page_report_bytes: Option<Vec<u8>>,
}
