//! # nber-harvest
//!
//! A consolidated scraper and bulk downloader for NBER working papers:
//! fetch a listing page into structured metadata records, bulk-fetch PDFs
//! over a numeric identifier range, and package the results as a spreadsheet
//! and a zip archive.
//!
//! ## Architecture
//!
//! - [`models`]: Core data structures (PaperRecord, DownloadOutcome, etc.)
//! - [`fetch`]: Pluggable fetch backends with retry and rate limiting
//! - [`extract`]: Selector-configured listing and detail page extraction
//! - [`download`]: Bounded-concurrency range downloading
//! - [`report`]: Spreadsheet, archive, and page-count serialization
//! - [`pipeline`]: Orchestration, validation, and progress events
//! - [`config`]: Configuration management
//! - [`progress`]: Progress event channel to the caller

pub mod config;
pub mod download;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod report;

// Re-export commonly used types
pub use models::{DownloadOutcome, PaperRecord, PipelineResult};
pub use pipeline::{Pipeline, PipelineJob};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
