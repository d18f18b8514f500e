// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// The global flags configure the crawler (database, timeouts, concurrency).
// The subcommands manage the URL queue and run the background loop.
// =============================================================================

use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

use link_crawler::config::{self, CrawlerConfig};

#[derive(Parser, Debug)]
#[command(
    name = "link-crawler",
    version,
    about = "Analyze queued web pages and find their broken outbound links",
    long_about = "link-crawler keeps a queue of submitted URLs in a SQLite database. \
                  The `run` command polls that queue, analyzes each page's HTML structure \
                  and checks every external link it finds."
)]
pub struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true, env = "LINK_CRAWLER_DB", default_value = config::DEFAULT_DB_PATH)]
    pub db: PathBuf,

    /// Log level (error, warn, info, debug, trace); RUST_LOG is read as well
    #[arg(long, global = true, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,

    /// Seconds to wait between two polling cycles
    #[arg(long, global = true, default_value_t = config::POLL_INTERVAL.as_secs())]
    pub poll_interval: u64,

    /// Seconds before a page fetch or link check gives up
    #[arg(long, global = true, default_value_t = config::LINK_CHECK_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// How many links of one page are checked at the same time
    #[arg(long, global = true, default_value_t = config::MAX_CONCURRENT_CHECKS)]
    pub max_concurrent_checks: usize,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Queue a URL for crawling
    ///
    /// Example: link-crawler add https://example.com
    Add {
        /// Absolute http(s) URL
        url: String,
    },

    /// List every submitted URL with its latest results
    List {
        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one URL, including its broken links
    Show {
        id: i64,

        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Delete a URL and its results
    Delete { id: i64 },

    /// Put a URL back in the queue so it is crawled again
    Requeue { id: i64 },

    /// Mark a queued or stopped URL as running
    StartUrl { id: i64 },

    /// Mark a running URL as stopped
    StopUrl { id: i64 },

    /// Run the crawl loop until Ctrl-C
    Run,

    /// Analyze a single page right away, without touching the database
    ///
    /// Example: link-crawler analyze https://example.com --json
    Analyze {
        url: String,

        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn crawler_config(&self) -> CrawlerConfig {
        CrawlerConfig {
            db_path: self.db.clone(),
            poll_interval: Duration::from_secs(self.poll_interval),
            link_check_timeout: Duration::from_secs(self.timeout),
            page_fetch_timeout: Duration::from_secs(self.timeout),
            max_concurrent_checks: self.max_concurrent_checks.max(1),
        }
    }
}
