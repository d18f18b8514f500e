// src/checker/http.rs
// =============================================================================
// This module checks if URLs are alive by making HTTP requests.
//
// Key functionality:
// - Makes HTTP HEAD requests (lightweight, no body download)
// - Collapses every failure mode (timeout, DNS, TLS, bad URL) into status 0
// - Runs many checks concurrently, but never more than a fixed cap
//
// A probe never returns an error. The caller decides what "broken" means
// with is_broken(): any 4xx/5xx status, or 0 for "no response at all".
// =============================================================================

use futures::stream::{self, StreamExt}; // StreamExt gives us .buffer_unordered()
use log::debug;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;

use crate::config::USER_AGENT;
use crate::error::Result;
use crate::model::BrokenLink;

/// Status reported when no HTTP response was obtained
pub const NO_RESPONSE: u16 = 0;

// Issues existence probes against outbound links
//
// Cloning is cheap: reqwest::Client is reference counted internally, so
// every clone shares one connection pool.
#[derive(Debug, Clone)]
pub struct LinkChecker {
    client: Client,
}

impl LinkChecker {
    /// Builds a checker whose probes give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    /// Probes one URL with a HEAD request
    ///
    /// Returns the HTTP status code, or NO_RESPONSE (0) if the request could
    /// not be built, the transport failed, or the timeout elapsed.
    pub async fn check(&self, url: &str) -> u16 {
        match self.client.head(url).send().await {
            Ok(response) => {
                let code = response.status().as_u16();
                debug!("HEAD {} -> {}", url, code);
                code
            }
            Err(e) => {
                debug!("HEAD {} failed ({}): {}", url, describe_failure(&e), e);
                NO_RESPONSE
            }
        }
    }
}

/// The broken-link threshold: error statuses and "no response"
pub fn is_broken(status_code: u16) -> bool {
    status_code == NO_RESPONSE || status_code >= 400
}

// Checks every URL and returns the ones that turned out broken
//
// `probe` is called once per URL. The stream is lazy, so a probe is only
// started when one of the `max_concurrent` slots is free; the remaining
// URLs wait their turn in discovery order. Results arrive in completion
// order, which is why the returned list is unordered.
//
// This function returns only after every probe has finished.
pub async fn check_links<F, Fut>(urls: Vec<String>, max_concurrent: usize, probe: F) -> Vec<BrokenLink>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = u16>,
{
    let futures = urls.into_iter().map(|url| {
        let pending = probe(url.clone());
        async move { (url, pending.await) }
    });

    stream::iter(futures)
        .buffer_unordered(max_concurrent.max(1))
        .filter_map(|(url, status_code)| async move {
            is_broken(status_code).then_some(BrokenLink { url, status_code })
        })
        .collect()
        .await
}

// Names the failure for the debug log
fn describe_failure(error: &reqwest::Error) -> &'static str {
    if error.is_timeout() {
        "timeout"
    } else if error.is_redirect() {
        "too many redirects"
    } else if error.is_connect() {
        "connection failed"
    } else if error.is_builder() {
        "invalid request"
    } else {
        "request error"
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why HEAD instead of GET?
//    - HEAD asks only for the headers, so no page body is downloaded
//    - We only care about the status code, so this is all we need
//
// 2. Why does check() return a plain u16 instead of Result?
//    - A link that cannot be reached is a normal outcome, not a failure
//      of our program
//    - Using 0 for "no response" keeps the result easy to store in a
//      database column next to real status codes
//
// 3. What does buffer_unordered(N) do again?
//    - It polls up to N futures at once and yields results as they finish
//    - Because our iterator is lazy, the (N+1)-th probe is not even
//      created until one of the first N completes
// -----------------------------------------------------------------------------
