//! Configuration management.
//!
//! Layers a TOML file and `NBER_HARVEST_`-prefixed environment variables over
//! serde defaults. The defaults target the NBER working-paper site; every
//! publisher-specific value (URLs, selectors, bibliographic constants) can be
//! overridden without touching code.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::extract::SelectorConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Fetching behavior (timeouts, retry, user agent)
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Rate limiting and concurrency
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// Publisher endpoints and bibliographic constants
    #[serde(default)]
    pub source: SourceConfig,

    /// HTML selectors for the listing and detail pages
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Output artifact paths
    #[serde(default)]
    pub output: OutputConfig,
}

/// Fetching behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User agent sent with every request. The publisher rejects bare
    /// library user agents, so the default mimics a browser.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Maximum attempts per URL (first try plus retries)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fetcher implementation to use ("http" is the only one shipped)
    #[serde(default = "default_fetcher_kind")]
    pub fetcher: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_attempts: default_max_attempts(),
            fetcher: default_fetcher_kind(),
        }
    }
}

impl FetchConfig {
    /// Per-request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connection timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_fetcher_kind() -> String {
    "http".to_string()
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per second across all workers
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    /// Bounded worker pool size for range downloads
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rps(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_rps() -> u32 {
    5
}

fn default_concurrency() -> usize {
    4
}

/// Publisher endpoints and the constant bibliographic columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Listing page enumerating recent papers
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    /// PDF URL template; `{id}` is replaced with the numeric identifier
    #[serde(default = "default_pdf_url_template")]
    pub pdf_url_template: String,

    /// Source name written into every spreadsheet row
    #[serde(default = "default_source_name")]
    pub source_name: String,

    /// Place of publication column
    #[serde(default = "default_place")]
    pub place: String,

    /// Publisher column
    #[serde(default = "default_publisher")]
    pub publisher: String,

    /// Series column
    #[serde(default = "default_series")]
    pub series: String,

    /// Prefix for the formatted `wpno` column
    #[serde(default = "default_wpno_prefix")]
    pub wpno_prefix: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            pdf_url_template: default_pdf_url_template(),
            source_name: default_source_name(),
            place: default_place(),
            publisher: default_publisher(),
            series: default_series(),
            wpno_prefix: default_wpno_prefix(),
        }
    }
}

impl SourceConfig {
    /// Map a numeric identifier to its artifact URL
    pub fn pdf_url(&self, identifier: u32) -> String {
        self.pdf_url_template.replace("{id}", &identifier.to_string())
    }
}

fn default_listing_url() -> String {
    "https://www.nber.org/papers?page=1&perPage=50&sortBy=public_date".to_string()
}

fn default_pdf_url_template() -> String {
    "https://www.nber.org/system/files/working_papers/w{id}/w{id}.pdf".to_string()
}

fn default_source_name() -> String {
    "National Bureau of Economic Research".to_string()
}

fn default_place() -> String {
    "Cambridge".to_string()
}

fn default_publisher() -> String {
    "NBER".to_string()
}

fn default_series() -> String {
    "NBER Working Papers ;".to_string()
}

fn default_wpno_prefix() -> String {
    "NBERWP".to_string()
}

/// Output artifact paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Metadata spreadsheet path
    #[serde(default = "default_table_path")]
    pub table_path: PathBuf,

    /// Zip archive path
    #[serde(default = "default_archive_path")]
    pub archive_path: PathBuf,

    /// Page-count report path
    #[serde(default = "default_page_report_path")]
    pub page_report_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            table_path: default_table_path(),
            archive_path: default_archive_path(),
            page_report_path: default_page_report_path(),
        }
    }
}

fn default_table_path() -> PathBuf {
    PathBuf::from("nber_data.csv")
}

fn default_archive_path() -> PathBuf {
    PathBuf::from("nber_papers.zip")
}

fn default_page_report_path() -> PathBuf {
    PathBuf::from("page_counts.csv")
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &PathBuf) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path.as_path()))
        .add_source(config::Environment::with_prefix("NBER_HARVEST").separator("__"))
        .build()?;

    settings.try_deserialize()
}
