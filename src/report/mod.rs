//! Output artifact construction: metadata table, zip archive, page counts.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::config::SourceConfig;
use crate::download::FetchedArtifact;
use crate::models::{DownloadOutcome, PaperRecord, ReportBundle};

/// Errors that can occur while serializing output artifacts
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// CSV serialization failed
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Zip serialization failed
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Underlying writer failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Column headers of the metadata table, in output order
const TABLE_HEADERS: [&str; 10] = [
    "Source", "Title1", "Subtitle", "Year", "WP_NO", "Author", "Place", "Publisher", "Series",
    "wpno",
];

/// Column headers of the page-count report
const PAGE_REPORT_HEADERS: [&str; 2] = ["File Name", "Number of Pages"];

/// Builds the [`ReportBundle`] for a pipeline run.
///
/// Output is deterministic: rows follow input order and nothing
/// time-dependent is embedded, so identical inputs produce byte-identical
/// files.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    source: SourceConfig,
}

impl ReportBuilder {
    /// Create a builder carrying the publisher's constant columns
    pub fn new(source: SourceConfig) -> Self {
        Self { source }
    }

    /// Build all artifacts for the given records and outcomes
    pub fn build(
        &self,
        records: &[PaperRecord],
        outcomes: &[DownloadOutcome],
        artifacts: &[FetchedArtifact],
    ) -> Result<ReportBundle, ReportError> {
        let tabular_bytes = self.build_table(records)?;
        let archive_bytes = if artifacts.is_empty() {
            None
        } else {
            Some(build_archive(artifacts)?)
        };
        let page_report_bytes = if outcomes.iter().any(|o| o.is_downloaded()) {
            Some(build_page_report(outcomes)?)
        } else {
            None
        };

        Ok(ReportBundle {
            tabular_bytes,
            archive_bytes,
            page_report_bytes,
        })
    }

    /// CSV table of metadata records in insertion order
    pub fn build_table(&self, records: &[PaperRecord]) -> Result<Vec<u8>, ReportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(TABLE_HEADERS)?;

        for record in records {
            let authors = record.authors_cell();
            let wpno = format!("{} {}", self.source.wpno_prefix, record.identifier);
            writer.write_record([
                self.source.source_name.as_str(),
                record.title.as_str(),
                record.subtitle_or_empty(),
                record.year_or_unknown(),
                record.identifier.as_str(),
                authors.as_str(),
                self.source.place.as_str(),
                self.source.publisher.as_str(),
                self.source.series.as_str(),
                wpno.as_str(),
            ])?;
        }

        writer
            .into_inner()
            .map_err(|e| ReportError::Io(e.into_error()))
    }
}

/// Zip of downloaded artifacts, one `w{identifier}.pdf` entry each
fn build_archive(artifacts: &[FetchedArtifact]) -> Result<Vec<u8>, ReportError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for artifact in artifacts {
        writer.start_file(format!("w{}.pdf", artifact.identifier), options)?;
        writer.write_all(&artifact.bytes)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// CSV report of page counts for the downloaded identifiers
fn build_page_report(outcomes: &[DownloadOutcome]) -> Result<Vec<u8>, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(PAGE_REPORT_HEADERS)?;

    for outcome in outcomes.iter().filter(|o| o.is_downloaded()) {
        let name = outcome.file_name();
        let pages = outcome
            .page_count
            .map(|p| p.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        writer.write_record([name.as_str(), pages.as_str()])?;
    }

    writer
        .into_inner()
        .map_err(|e| ReportError::Io(e.into_error()))
}
