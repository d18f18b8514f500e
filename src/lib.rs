// src/lib.rs
// =============================================================================
// link-crawler: analyzes queued web pages and checks their outbound links.
//
// Modules:
// - checker: page structure scan and link health probes
// - crawl: page fetching and the background polling loop
// - store: SQLite persistence for URLs, analyses and broken links
// - model, config, error, logging: shared plumbing
// =============================================================================

pub mod checker;
pub mod config;
pub mod crawl;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;

pub use checker::{LinkChecker, PageAnalyzer};
pub use config::CrawlerConfig;
pub use crawl::{Crawler, PageFetcher};
pub use error::{CrawlError, Result};
pub use model::{AnalysisResult, BrokenLink, HtmlVersion, UrlRecord, UrlStatus};
pub use store::Store;
