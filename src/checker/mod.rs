// src/checker/mod.rs
// =============================================================================
// This module contains the page analysis and link checking logic.
//
// Submodules:
// - http: Probes links with HEAD requests, bounded fan-out
// - html: Walks a parsed page and collects its structure
// - analyzer: Combines both into an AnalysisResult
// =============================================================================

mod analyzer;
mod html;
mod http;

pub use analyzer::PageAnalyzer;
pub use html::{classify_link, detect_html_version, scan_document, LinkKind, PageScan};
pub use http::{check_links, is_broken, LinkChecker, NO_RESPONSE};
