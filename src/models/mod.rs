//! Core data models for paper metadata and download bookkeeping.

mod outcome;
mod record;

pub use outcome::{
    DownloadOutcome, DownloadStatus, FetchResult, FetchStatus, PipelineResult, ReportBundle,
};
pub use record::{split_title, PaperRecord, PaperRecordBuilder, UNKNOWN_FIELD};
