// src/config.rs
// =============================================================================
// Default settings for the crawler and the struct that carries them around.
//
// The constants are the defaults. The CLI builds a CrawlerConfig from them and
// overrides whatever the user passed as flags.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

/// Database file used when neither `--db` nor `LINK_CRAWLER_DB` is given
pub const DEFAULT_DB_PATH: &str = "./link_crawler.db";

/// Pause between two polling cycles of the background loop
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Timeout for a single link-health probe
pub const LINK_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for fetching the page that is being analyzed
pub const PAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// How many link checks may be in flight for one page
pub const MAX_CONCURRENT_CHECKS: usize = 10;

/// User-Agent sent with every request
pub const USER_AGENT: &str = concat!("link-crawler/", env!("CARGO_PKG_VERSION"));

// Everything the crawler needs to know at runtime
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub db_path: PathBuf,
    pub poll_interval: Duration,
    pub link_check_timeout: Duration,
    pub page_fetch_timeout: Duration,
    pub max_concurrent_checks: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            poll_interval: POLL_INTERVAL,
            link_check_timeout: LINK_CHECK_TIMEOUT,
            page_fetch_timeout: PAGE_FETCH_TIMEOUT,
            max_concurrent_checks: MAX_CONCURRENT_CHECKS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = CrawlerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.link_check_timeout, Duration::from_secs(5));
        assert_eq!(config.max_concurrent_checks, 10);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
    }
}
