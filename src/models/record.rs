//! Paper record model produced by the extractors.

use serde::{Deserialize, Serialize};

/// Sentinel used when an optional bibliographic field is absent from the page.
pub const UNKNOWN_FIELD: &str = "unknown";

/// Bibliographic metadata for one working paper.
///
/// Produced from one listing entry or one detail page. Optional fields are
/// `None` when the page does not carry them; report output substitutes the
/// [`UNKNOWN_FIELD`] sentinel rather than dropping the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Publisher's numeric working-paper number (e.g. "w33405" stripped to "33405")
    pub identifier: String,

    /// Main title (text before the first colon)
    pub title: String,

    /// Subtitle, present only when the title contains a colon
    pub subtitle: Option<String>,

    /// Authors in page order
    pub authors: Vec<String>,

    /// Publication year label
    pub year: Option<String>,

    /// Digital Object Identifier (detail pages only)
    pub doi: Option<String>,

    /// Page the record was extracted from
    pub source_url: String,
}

impl PaperRecord {
    /// Create a record with required fields only
    pub fn new(identifier: String, title: String, source_url: String) -> Self {
        let (main, subtitle) = split_title(&title);
        Self {
            identifier,
            title: main,
            subtitle,
            authors: Vec::new(),
            year: None,
            doi: None,
            source_url,
        }
    }

    /// Year label, or the unknown sentinel
    pub fn year_or_unknown(&self) -> &str {
        self.year.as_deref().unwrap_or(UNKNOWN_FIELD)
    }

    /// Subtitle, or empty when the title had no colon
    pub fn subtitle_or_empty(&self) -> &str {
        self.subtitle.as_deref().unwrap_or("")
    }

    /// Authors joined for the single spreadsheet cell
    pub fn authors_cell(&self) -> String {
        if self.authors.is_empty() {
            UNKNOWN_FIELD.to_string()
        } else {
            self.authors.join(", ")
        }
    }
}

/// Split a title at the first colon into (main title, subtitle).
///
/// Total over all inputs: additional colons stay in the subtitle, and a title
/// without a colon yields no subtitle. Halves are kept verbatim so that a
/// one-colon title rejoins losslessly.
pub fn split_title(title: &str) -> (String, Option<String>) {
    match title.split_once(':') {
        Some((main, subtitle)) => (main.to_string(), Some(subtitle.to_string())),
        None => (title.to_string(), None),
    }
}

/// Builder for constructing [`PaperRecord`] values field by field
#[derive(Debug, Clone)]
pub struct PaperRecordBuilder {
    record: PaperRecord,
}

impl PaperRecordBuilder {
    /// Create a new builder with required fields
    pub fn new(
        identifier: impl Into<String>,
        title: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            record: PaperRecord::new(identifier.into(), title.into(), source_url.into()),
        }
    }

    /// Set authors
    pub fn authors(mut self, authors: Vec<String>) -> Self {
        self.record.authors = authors;
        self
    }

    /// Set year
    pub fn year(mut self, year: impl Into<String>) -> Self {
        self.record.year = Some(year.into());
        self
    }

    /// Set DOI
    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.record.doi = Some(doi.into());
        self
    }

    /// Build the record
    pub fn build(self) -> PaperRecord {
        self.record
    }
}
