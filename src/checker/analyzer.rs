// src/checker/analyzer.rs
// =============================================================================
// Turns one parsed page into a complete AnalysisResult.
//
// Two phases:
// 1. scan_document() walks the tree (synchronous, no network)
// 2. every external link is probed, at most `max_concurrent_checks` at a
//    time, and the broken ones are folded into the result
//
// The analyzer waits for all probes before returning. Probes that are
// already running are never aborted; they finish or hit their own timeout.
// =============================================================================

use log::debug;
use scraper::Html;
use std::future::Future;

use super::html::{scan_document, PageScan};
use super::http::{check_links, LinkChecker};
use crate::model::AnalysisResult;

#[derive(Debug, Clone)]
pub struct PageAnalyzer {
    checker: LinkChecker,
    max_concurrent_checks: usize,
}

impl PageAnalyzer {
    pub fn new(checker: LinkChecker, max_concurrent_checks: usize) -> Self {
        Self {
            checker,
            max_concurrent_checks,
        }
    }

    // Analyzes a parsed document fetched from `base_url`
    //
    // The structural scan runs right away, so the returned future does not
    // borrow the document. That matters because scraper::Html is not Send
    // and could not be held across an .await inside a spawned task.
    pub fn analyze(
        &self,
        document: &Html,
        base_url: &str,
    ) -> impl Future<Output = AnalysisResult> + '_ {
        let scan = scan_document(document, base_url);
        self.check_external_links(scan)
    }

    /// Parses raw HTML and analyzes it
    pub async fn analyze_html(&self, html: &str, base_url: &str) -> AnalysisResult {
        let scan = {
            let document = Html::parse_document(html);
            scan_document(&document, base_url)
        };
        self.check_external_links(scan).await
    }

    async fn check_external_links(&self, scan: PageScan) -> AnalysisResult {
        let PageScan {
            mut result,
            external_links,
        } = scan;

        debug!(
            "Checking {} external link(s), {} at a time",
            external_links.len(),
            self.max_concurrent_checks
        );

        let checker = &self.checker;
        let broken = check_links(external_links, self.max_concurrent_checks, |url| async move {
            checker.check(&url).await
        })
        .await;

        result.broken_links = broken.len();
        result.broken_links_list = broken;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BrokenLink, HtmlVersion};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn analyzer(timeout: Duration) -> PageAnalyzer {
        PageAnalyzer::new(LinkChecker::new(timeout).unwrap(), 10)
    }

    #[tokio::test]
    async fn test_reference_scenario_with_dead_external_link() {
        let other = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/y"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&other)
            .await;

        let dead = format!("{}/y", other.uri());
        let html = format!(
            r#"<!DOCTYPE html><title>T</title><h1>A</h1><h2>B</h2><a href="/x">i</a><a href="{}">e</a>"#,
            dead
        );

        let result = analyzer(Duration::from_secs(5))
            .analyze_html(&html, "http://site.com")
            .await;

        assert_eq!(result.html_version, Some(HtmlVersion::Html5));
        assert_eq!(result.title, "T");
        assert_eq!(result.heading_count(1), 1);
        assert_eq!(result.heading_count(2), 1);
        assert_eq!(result.internal_links, 1);
        assert_eq!(result.external_links, 1);
        assert_eq!(result.broken_links, 1);
        assert_eq!(
            result.broken_links_list,
            vec![BrokenLink { url: dead, status_code: 404 }]
        );
        assert!(!result.has_login_form);
    }

    #[tokio::test]
    async fn test_internal_links_are_never_probed() {
        let site = MockServer::start().await;
        // Any probe against this server would be a bug
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&site)
            .await;

        let html = format!(
            r#"<a href="{0}/a">a</a><a href="{0}/b">b</a><a href="/c">c</a>"#,
            site.uri()
        );
        let result = analyzer(Duration::from_secs(5))
            .analyze_html(&html, &site.uri())
            .await;

        assert_eq!(result.internal_links, 3);
        assert_eq!(result.external_links, 0);
        assert_eq!(result.broken_links, 0);
        site.verify().await;
    }

    #[tokio::test]
    async fn test_timed_out_probe_is_broken_with_status_zero() {
        let slow = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&slow)
            .await;

        let html = format!(r#"<a href="{}/slow">slow</a>"#, slow.uri());
        let result = analyzer(Duration::from_millis(200))
            .analyze_html(&html, "http://site.com")
            .await;

        assert_eq!(result.broken_links, 1);
        assert_eq!(result.broken_links_list[0].status_code, 0);
    }

    #[tokio::test]
    async fn test_live_links_give_identical_results() {
        let live = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&live)
            .await;

        let html = format!(
            r#"<!DOCTYPE html><title>Same</title><h1>x</h1>
               <a href="{0}/1">1</a><a href="{0}/2">2</a><a href="/3">3</a>
               <form action="/login"></form>"#,
            live.uri()
        );
        let analyzer = analyzer(Duration::from_secs(5));

        let first = analyzer.analyze_html(&html, "http://site.com").await;
        let second = analyzer.analyze_html(&html, "http://site.com").await;

        assert_eq!(first, second);
        assert_eq!(first.broken_links, 0);
        assert!(first.has_login_form);
    }

    #[tokio::test]
    async fn test_every_broken_link_was_external() {
        let dead = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&dead)
            .await;

        let html = format!(
            r#"<a href="{0}/a">a</a><a href="{0}/b">b</a><a href="http://site.com/in">in</a><a href="/rel">rel</a>"#,
            dead.uri()
        );
        let document = Html::parse_document(&html);
        let scan = scan_document(&document, "http://site.com");
        let result = analyzer(Duration::from_secs(5))
            .analyze(&document, "http://site.com")
            .await;

        assert_eq!(result.broken_links, result.broken_links_list.len());
        assert_eq!(result.broken_links, 2);
        for broken in &result.broken_links_list {
            assert!(scan.external_links.contains(&broken.url));
            assert_eq!(broken.status_code, 503);
        }
    }
}
