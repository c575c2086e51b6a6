//! Detail page extraction.

use regex::Regex;
use scraper::{Html, Selector};

use crate::models::{PaperRecord, PaperRecordBuilder};

use super::selectors::parse_selector;
use super::{ExtractError, SelectorConfig};

/// Extracts a single [`PaperRecord`] from one paper's detail page.
///
/// Detail pages carry Highwire citation meta tags, which survive markup
/// redesigns far better than layout classes, so those are read first; the
/// configured heading selector is the fallback for the title. Optional
/// fields (DOI, date) default to absent, never fail the record.
#[derive(Debug)]
pub struct DetailExtractor {
    title_fallback: Selector,
    meta_title: Selector,
    meta_author: Selector,
    meta_doi: Selector,
    meta_date: Selector,
    identifier_in_url: Regex,
    year_label: Regex,
}

impl DetailExtractor {
    /// Compile the configured selectors
    pub fn new(config: &SelectorConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            title_fallback: parse_selector("detail_title", &config.detail_title)?,
            // unwraps on literal patterns cannot fail
            meta_title: Selector::parse(r#"meta[name="citation_title"]"#).unwrap(),
            meta_author: Selector::parse(r#"meta[name="citation_author"]"#).unwrap(),
            meta_doi: Selector::parse(r#"meta[name="citation_doi"]"#).unwrap(),
            meta_date: Selector::parse(r#"meta[name="citation_publication_date"]"#).unwrap(),
            identifier_in_url: Regex::new(r"w?(\d+)").unwrap(),
            year_label: Regex::new(r"\b(\d{4})\b").unwrap(),
        })
    }

    /// Extract the record for the paper at `page_url`
    pub fn extract(&self, html: &str, page_url: &str) -> Result<PaperRecord, ExtractError> {
        let document = Html::parse_document(html);

        let title = self
            .meta_content(&document, &self.meta_title)
            .or_else(|| {
                document
                    .select(&self.title_fallback)
                    .next()
                    .map(|e| e.text().collect::<String>().trim().to_string())
                    .filter(|t| !t.is_empty())
            })
            .ok_or(ExtractError::MissingField("title"))?;

        let identifier = self
            .identifier_in_url
            .captures(page_url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or(ExtractError::MissingField("identifier"))?;

        let authors: Vec<String> = document
            .select(&self.meta_author)
            .filter_map(|e| e.value().attr("content"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let mut builder =
            PaperRecordBuilder::new(identifier, title, page_url.to_string()).authors(authors);

        if let Some(doi) = self.meta_content(&document, &self.meta_doi) {
            builder = builder.doi(doi);
        }
        if let Some(year) = self
            .meta_content(&document, &self.meta_date)
            .and_then(|d| {
                self.year_label
                    .captures(&d)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
            })
        {
            builder = builder.year(year);
        }

        Ok(builder.build())
    }

    fn meta_content(&self, document: &Html, selector: &Selector) -> Option<String> {
        document
            .select(selector)
            .next()
            .and_then(|e| e.value().attr("content"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
