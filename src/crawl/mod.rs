// src/crawl/mod.rs
// =============================================================================
// This module runs the crawl itself.
//
// - fetch: downloads the page that is about to be analyzed
// - lifecycle: the background polling loop and its start/stop handle
// =============================================================================

mod fetch;
mod lifecycle;

pub use fetch::PageFetcher;
pub use lifecycle::Crawler;
