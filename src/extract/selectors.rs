//! Selector configuration shared by the extractors.

use scraper::Selector;
use serde::{Deserialize, Serialize};

use super::ExtractError;

/// CSS selectors targeting the publisher's markup.
///
/// Defaults match the NBER listing and detail pages as of early 2026. The
/// site's markup has drifted repeatedly in the past, so all of these are
/// overridable through the configuration file; a markup change is an
/// operational event, not a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Container holding all listing entries
    #[serde(default = "default_container")]
    pub container: String,

    /// One listing entry
    #[serde(default = "default_entry")]
    pub entry: String,

    /// Title element within an entry
    #[serde(default = "default_title")]
    pub title: String,

    /// Date label within an entry
    #[serde(default = "default_year")]
    pub year: String,

    /// Working-paper number anchor within an entry
    #[serde(default = "default_identifier")]
    pub identifier: String,

    /// Authors element within an entry
    #[serde(default = "default_authors")]
    pub authors: String,

    /// Title heading on a detail page (fallback when meta tags are absent)
    #[serde(default = "default_detail_title")]
    pub detail_title: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            container: default_container(),
            entry: default_entry(),
            title: default_title(),
            year: default_year(),
            identifier: default_identifier(),
            authors: default_authors(),
            detail_title: default_detail_title(),
        }
    }
}

fn default_container() -> String {
    ".promo-grid__promos".to_string()
}

fn default_entry() -> String {
    "div.digest-card".to_string()
}

fn default_title() -> String {
    "div.digest-card__title".to_string()
}

fn default_year() -> String {
    "span.digest-card__label".to_string()
}

fn default_identifier() -> String {
    "a.paper-card__paper_number".to_string()
}

fn default_authors() -> String {
    "div.digest-card__items".to_string()
}

fn default_detail_title() -> String {
    "h1.page-header__title".to_string()
}

/// Parse one configured selector, naming the field on failure
pub(super) fn parse_selector(name: &'static str, text: &str) -> Result<Selector, ExtractError> {
    Selector::parse(text).map_err(|e| ExtractError::Selector {
        name,
        detail: e.to_string(),
    })
}
