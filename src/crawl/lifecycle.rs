// src/crawl/lifecycle.rs
// =============================================================================
// The background crawl loop and the handle that starts and stops it.
//
// How it works:
// 1. Ask the store for every URL that is currently queued
// 2. For each one: mark it running, fetch it, analyze it, save the result
// 3. Sleep for the poll interval, then start over
//
// Only one loop can exist per Crawler. start() and stop() are both
// idempotent and report whether they changed anything.
//
// Stopping is cooperative. The loop checks its CancellationToken before each
// cycle, between two URLs and while sleeping. A page that is already being
// analyzed is finished first (its link checks are allowed to drain). stop()
// waits for the loop task to exit, so once it returns nothing else will be
// written to the store.
// =============================================================================

use log::{error, info, warn};
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::fetch::PageFetcher;
use crate::checker::{LinkChecker, PageAnalyzer};
use crate::config::CrawlerConfig;
use crate::error::Result;
use crate::model::{AnalysisResult, UrlStatus};
use crate::store::Store;

pub struct Crawler {
    worker: Arc<Worker>,
    running: Mutex<Option<RunHandle>>,
}

// What a live loop leaves behind for stop() to use
struct RunHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

// Everything the loop needs, shared with the spawned task
struct Worker {
    store: Store,
    fetcher: PageFetcher,
    analyzer: PageAnalyzer,
    poll_interval: Duration,
}

impl Crawler {
    pub fn new(store: Store, config: &CrawlerConfig) -> Result<Self> {
        let checker = LinkChecker::new(config.link_check_timeout)?;
        let worker = Worker {
            store,
            fetcher: PageFetcher::new(config.page_fetch_timeout)?,
            analyzer: PageAnalyzer::new(checker, config.max_concurrent_checks),
            poll_interval: config.poll_interval,
        };

        Ok(Self {
            worker: Arc::new(worker),
            running: Mutex::new(None),
        })
    }

    /// Spawns the polling loop; returns false if it was already running
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if running.is_some() {
            info!("Crawler already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.worker.clone().run(cancel.clone()));
        *running = Some(RunHandle { cancel, task });

        info!("Crawling started");
        true
    }

    // Signals the loop to stop and waits until it has exited
    //
    // Returns false if there was nothing to stop. The lock is held while
    // waiting, so a concurrent start() cannot slip in a second loop.
    pub async fn stop(&self) -> bool {
        let mut running = self.running.lock().await;
        let Some(handle) = running.take() else {
            info!("Crawler is not running");
            return false;
        };

        handle.cancel.cancel();
        if let Err(e) = handle.task.await {
            error!("Crawl loop ended abnormally: {}", e);
        }

        info!("Crawler fully stopped");
        true
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }
}

impl Worker {
    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                break;
            }

            self.process_queued(&cancel).await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        info!("Crawling stopped");
    }

    // One polling cycle over the current batch of queued URLs
    async fn process_queued(&self, cancel: &CancellationToken) {
        let queued = match self.store.fetch_queued().await {
            Ok(queued) => queued,
            Err(e) => {
                error!("Error selecting queued urls: {}", e);
                return;
            }
        };

        for (id, url) in queued {
            if cancel.is_cancelled() {
                info!("Polling cycle cancelled");
                return;
            }
            self.process_url(id, &url).await;
        }
    }

    // Takes one URL from queued to done or error
    //
    // Store failures never escape this function. If the URL cannot even be
    // marked running it is left queued for the next cycle; if saving the
    // result fails we try once to mark it error so it does not stay running.
    // Final writes only happen while the URL is still running, so a stop-url
    // or requeue issued during processing wins.
    async fn process_url(&self, id: i64, url: &str) {
        info!("Starting processing url: {}", url);

        if let Err(e) = self.store.set_status(id, UrlStatus::Running).await {
            error!("Could not mark url {} as running, skipping: {}", id, e);
            return;
        }

        let result = match self.fetch_and_analyze(url).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Processing {} failed: {}", url, e);
                self.mark_error(id).await;
                return;
            }
        };

        match self.persist(id, &result).await {
            Ok(true) => {}
            Ok(false) => {
                info!("Url {} changed status while being processed, result dropped", id);
                return;
            }
            Err(e) => {
                error!("Failed to save analysis results for {}: {}", url, e);
                self.mark_error(id).await;
                return;
            }
        }

        info!(
            "Processing finished: {} ({} external link(s), {} broken)",
            url, result.external_links, result.broken_links
        );
    }

    async fn fetch_and_analyze(&self, url: &str) -> Result<AnalysisResult> {
        let html = self.fetcher.fetch(url).await?;

        // The parsed document is not Send, so it must be gone before the
        // link checks are awaited
        let pending = {
            let document = Html::parse_document(&html);
            self.analyzer.analyze(&document, url)
        };

        Ok(pending.await)
    }

    // Broken links go first so that "done" always comes with its link list.
    // Returns false if the URL is no longer running.
    async fn persist(&self, id: i64, result: &AnalysisResult) -> Result<bool> {
        self.store
            .replace_broken_links(id, &result.broken_links_list)
            .await?;
        self.store.save_analysis(id, result).await
    }

    // A URL the user stopped or requeued meanwhile keeps that status
    async fn mark_error(&self, id: i64) {
        match self
            .store
            .transition(id, &[UrlStatus::Running], UrlStatus::Error)
            .await
        {
            Ok(true) => {}
            Ok(false) => info!("Url {} is no longer running, not marking it error", id),
            Err(e) => error!("Status updating failed for url {}: {}", id, e),
        }
    }
}
