//! Listing page extraction.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::models::{PaperRecord, PaperRecordBuilder};

use super::selectors::parse_selector;
use super::{ExtractError, SelectorConfig};

/// Prefix the listing page prepends to the authors cell
const AUTHORS_PREFIX: &str = "Author(s) - ";

/// Result of extracting one listing page
#[derive(Debug)]
pub struct ListingExtraction {
    /// Records in page order
    pub records: Vec<PaperRecord>,
    /// Entries dropped for missing required fields
    pub skipped: usize,
}

/// Extracts [`PaperRecord`]s from a listing page.
///
/// An entry missing any of title, year, identifier, or authors is dropped
/// and counted, never fatal for the rest of the page. A missing container is
/// fatal for the page: it means the markup no longer matches the selectors.
#[derive(Debug)]
pub struct ListingExtractor {
    container: Selector,
    entry: Selector,
    title: Selector,
    year: Selector,
    identifier: Selector,
    authors: Selector,
    numeric_id: Regex,
    year_label: Regex,
}

impl ListingExtractor {
    /// Compile the configured selectors
    pub fn new(config: &SelectorConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            container: parse_selector("container", &config.container)?,
            entry: parse_selector("entry", &config.entry)?,
            title: parse_selector("title", &config.title)?,
            year: parse_selector("year", &config.year)?,
            identifier: parse_selector("identifier", &config.identifier)?,
            authors: parse_selector("authors", &config.authors)?,
            // unwraps on literal patterns cannot fail
            numeric_id: Regex::new(r"(\d+)").unwrap(),
            year_label: Regex::new(r"\b(\d{4})\b").unwrap(),
        })
    }

    /// Extract all records from one listing page
    pub fn extract(&self, html: &str, page_url: &str) -> Result<ListingExtraction, ExtractError> {
        let document = Html::parse_document(html);
        let container = document
            .select(&self.container)
            .next()
            .ok_or(ExtractError::ContainerNotFound)?;

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for entry in container.select(&self.entry) {
            match self.extract_entry(&entry, page_url) {
                Some(record) => records.push(record),
                None => {
                    skipped += 1;
                    tracing::debug!(page_url, "listing entry missing required fields, skipped");
                }
            }
        }

        tracing::info!(
            page_url,
            extracted = records.len(),
            skipped,
            "listing page extracted"
        );

        Ok(ListingExtraction { records, skipped })
    }

    /// Pull one entry's fields; `None` drops the entry as skipped
    fn extract_entry(&self, entry: &ElementRef, page_url: &str) -> Option<PaperRecord> {
        let title = self.text_of(entry, &self.title)?;
        let year_label = self.text_of(entry, &self.year)?;
        let identifier_elem = entry.select(&self.identifier).next()?;
        let authors_cell = self.text_of(entry, &self.authors)?;

        let identifier_text = collect_text(&identifier_elem);
        let identifier = self
            .numeric_id
            .captures(&identifier_text)?
            .get(1)?
            .as_str()
            .to_string();

        let year = self
            .year_label
            .captures(&year_label)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        let authors = split_authors(&authors_cell);

        // Prefer the entry's own link as the record's origin
        let source_url = identifier_elem
            .value()
            .attr("href")
            .and_then(|href| resolve_href(page_url, href))
            .unwrap_or_else(|| page_url.to_string());

        let mut builder = PaperRecordBuilder::new(identifier, title, source_url).authors(authors);
        if let Some(year) = year {
            builder = builder.year(year);
        }
        Some(builder.build())
    }

    fn text_of(&self, entry: &ElementRef, selector: &Selector) -> Option<String> {
        let text = collect_text(&entry.select(selector).next()?);
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

fn collect_text(elem: &ElementRef) -> String {
    elem.text().collect::<String>().trim().to_string()
}

/// Strip the page's "Author(s) - " prefix and split into an ordered list
fn split_authors(cell: &str) -> Vec<String> {
    let cell = cell.strip_prefix(AUTHORS_PREFIX).unwrap_or(cell);
    cell.split(&[',', '&'][..])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn resolve_href(page_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}
