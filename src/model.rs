// src/model.rs
// =============================================================================
// Data types shared by the analyzer, the crawl loop and the store.
//
// - UrlStatus: where a submitted URL is in its lifecycle
// - UrlRecord: one row of the urls table
// - AnalysisResult / BrokenLink: what analyzing one page produces
// =============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a single submitted URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlStatus {
    Queued,
    Running,
    Done,
    Error,
    Stopped,
}

impl UrlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlStatus::Queued => "queued",
            UrlStatus::Running => "running",
            UrlStatus::Done => "done",
            UrlStatus::Error => "error",
            UrlStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UrlStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(UrlStatus::Queued),
            "running" => Ok(UrlStatus::Running),
            "done" => Ok(UrlStatus::Done),
            "error" => Ok(UrlStatus::Error),
            "stopped" => Ok(UrlStatus::Stopped),
            other => Err(format!("unknown url status '{}'", other)),
        }
    }
}

/// HTML flavour announced by the document's doctype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HtmlVersion {
    #[serde(rename = "HTML5")]
    Html5,
    #[serde(rename = "XHTML")]
    Xhtml,
    Unknown,
}

impl HtmlVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            HtmlVersion::Html5 => "HTML5",
            HtmlVersion::Xhtml => "XHTML",
            HtmlVersion::Unknown => "Unknown",
        }
    }

    // Inverse of as_str; an empty column means "no doctype seen"
    pub fn parse_label(label: &str) -> Option<Self> {
        match label {
            "HTML5" => Some(HtmlVersion::Html5),
            "XHTML" => Some(HtmlVersion::Xhtml),
            "Unknown" => Some(HtmlVersion::Unknown),
            _ => None,
        }
    }
}

/// An external link whose probe failed
///
/// `status_code` is 0 when no HTTP response was received at all
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrokenLink {
    pub url: String,
    pub status_code: u16,
}

/// Structural facts about one page plus the health of its external links
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// None when the document has no doctype
    pub html_version: Option<HtmlVersion>,
    pub title: String,
    /// Keyed "h1".."h6"; levels that never appear are absent
    pub headings: BTreeMap<String, usize>,
    pub internal_links: usize,
    pub external_links: usize,
    pub broken_links: usize,
    pub broken_links_list: Vec<BrokenLink>,
    pub has_login_form: bool,
}

impl AnalysisResult {
    /// Count for heading level 1..=6 (0 for anything else)
    pub fn heading_count(&self, level: u8) -> usize {
        self.headings
            .get(&format!("h{}", level))
            .copied()
            .unwrap_or(0)
    }
}

/// One submitted URL together with its last analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub id: i64,
    pub url: String,
    pub status: UrlStatus,
    pub created_at: String,
    #[serde(flatten)]
    pub analysis: AnalysisResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            UrlStatus::Queued,
            UrlStatus::Running,
            UrlStatus::Done,
            UrlStatus::Error,
            UrlStatus::Stopped,
        ] {
            assert_eq!(status.as_str().parse::<UrlStatus>(), Ok(status));
        }
        assert!("paused".parse::<UrlStatus>().is_err());
    }

    #[test]
    fn test_html_version_labels() {
        assert_eq!(HtmlVersion::parse_label("XHTML"), Some(HtmlVersion::Xhtml));
        assert_eq!(HtmlVersion::parse_label(""), None);
        assert_eq!(
            serde_json::to_string(&HtmlVersion::Html5).unwrap(),
            "\"HTML5\""
        );
    }

    #[test]
    fn test_heading_count_defaults_to_zero() {
        let mut result = AnalysisResult::default();
        result.headings.insert("h2".to_string(), 3);
        assert_eq!(result.heading_count(2), 3);
        assert_eq!(result.heading_count(1), 0);
        assert_eq!(result.heading_count(9), 0);
    }
}
