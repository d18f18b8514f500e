// src/crawl/fetch.rs
// =============================================================================
// Downloads the page that is about to be analyzed.
//
// A page only counts as fetched when:
// - the request got a response at all (otherwise CrawlError::Fetch)
// - the final status is below 400, redirects are followed
//   (otherwise CrawlError::HttpStatus)
// - the response declares an HTML content type, or none at all
//   (otherwise CrawlError::Parse)
// =============================================================================

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

use crate::config::USER_AGENT;
use crate::error::{CrawlError, Result};

#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    // Fetches a web page and returns its HTML content
    //
    // Bytes that are not valid UTF-8 are replaced rather than rejected;
    // html5ever copes with whatever text it gets.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(CrawlError::HttpStatus(status.as_u16()));
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !content_type.to_ascii_lowercase().contains("html") {
                return Err(CrawlError::Parse(format!(
                    "expected an HTML document, got '{}'",
                    content_type
                )));
            }
        }

        let body = response.bytes().await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
