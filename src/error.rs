// src/error.rs
// =============================================================================
// Error types for the library side of the crawler.
//
// Only page-level problems are errors. A dead outbound link is not an error,
// it is data that ends up in AnalysisResult::broken_links_list.
// =============================================================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    /// The page request failed before any response arrived
    #[error("Request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The page answered with a 4xx or 5xx status
    #[error("HTTP {0}")]
    HttpStatus(u16),

    /// The response could not be treated as an HTML document
    #[error("Could not parse page: {0}")]
    Parse(String),

    /// A read or write against the database failed
    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),

    /// A submitted URL is not an absolute http(s) URL
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
