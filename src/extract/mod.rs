//! HTML extraction.
//!
//! The near-duplicate scraper variants differed only in which CSS selectors
//! they targeted. Here the selectors are data ([`SelectorConfig`]) and the
//! extraction logic exists once: [`ListingExtractor`] for pages enumerating
//! many papers, [`DetailExtractor`] for a single paper's page.

mod detail;
mod listing;
mod selectors;

pub use detail::DetailExtractor;
pub use listing::{ListingExtraction, ListingExtractor};
pub use selectors::SelectorConfig;

/// Errors that can occur during extraction
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// A configured CSS selector failed to parse
    #[error("invalid selector {name:?}: {detail}")]
    Selector {
        /// Which configuration field held the bad selector
        name: &'static str,
        /// Parser message
        detail: String,
    },

    /// The page lacked the container the selectors are rooted at
    #[error("listing container not found; the site markup may have changed")]
    ContainerNotFound,

    /// A required field was absent from a detail page
    #[error("missing required field {0:?}")]
    MissingField(&'static str),
}
