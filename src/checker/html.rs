// src/checker/html.rs
// =============================================================================
// This module reads the structure of one HTML page.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Exposes the node tree, so we can walk it ourselves
// - Is built on html5ever (Mozilla's HTML parser)
//
// One pass over the tree collects everything except link health:
// - the doctype (HTML5 / XHTML / Unknown)
// - the first <title>
// - how many h1..h6 elements there are
// - internal vs external links
// - whether a form looks like a login form
//
// The external links are handed back in discovery order so the analyzer can
// check them afterwards. This pass never touches the network.
// =============================================================================

use scraper::node::Element;
use scraper::{Html, Node};

use crate::model::{AnalysisResult, HtmlVersion};

/// Outcome of the structural pass over one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageScan {
    /// Every field filled in except the broken-link ones
    pub result: AnalysisResult,
    /// Links classified external, in the order they were found
    pub external_links: Vec<String>,
}

/// Where a link points relative to the analyzed page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Internal,
    External,
}

// Walks the document once and collects its structural facts
//
// Parameters:
//   document: the parsed page
//   base_url: the URL the page was fetched from
//
// Every <a> with a non-empty href is counted exactly once, as internal or
// external, so internal_links + external_links equals the number of such
// anchors.
pub fn scan_document(document: &Html, base_url: &str) -> PageScan {
    let mut scan = PageScan::default();
    scan.result.html_version = detect_html_version(document);

    let mut title_seen = false;

    // descendants() is a pre-order walk starting at the document root
    for node in document.tree.root().descendants() {
        let Node::Element(element) = node.value() else {
            continue;
        };

        match element.name() {
            "title" if !title_seen => {
                title_seen = true;
                scan.result.title = node
                    .first_child()
                    .and_then(|child| match child.value() {
                        Node::Text(text) => Some((**text).to_owned()),
                        _ => None,
                    })
                    .unwrap_or_default();
            }
            level @ ("h1" | "h2" | "h3" | "h4" | "h5" | "h6") => {
                *scan.result.headings.entry(level.to_string()).or_insert(0) += 1;
            }
            "a" => {
                let Some(href) = element.attr("href").filter(|href| !href.is_empty()) else {
                    continue;
                };
                match classify_link(href, base_url) {
                    LinkKind::Internal => scan.result.internal_links += 1,
                    LinkKind::External => {
                        scan.result.external_links += 1;
                        scan.external_links.push(href.to_string());
                    }
                }
            }
            "form" => {
                if is_login_form(element) {
                    scan.result.has_login_form = true;
                }
            }
            _ => {}
        }
    }

    scan
}

// Looks at the top-level nodes only; the first doctype found decides
pub fn detect_html_version(document: &Html) -> Option<HtmlVersion> {
    document.tree.root().children().find_map(|node| match node.value() {
        Node::Doctype(doctype) => Some(classify_doctype(&format!(
            "{} {} {}",
            doctype.name(),
            doctype.public_id(),
            doctype.system_id()
        ))),
        _ => None,
    })
}

// "xhtml" also contains "html", so it has to be tested first
fn classify_doctype(doctype: &str) -> HtmlVersion {
    let doctype = doctype.to_lowercase();
    if doctype.contains("xhtml") {
        HtmlVersion::Xhtml
    } else if doctype.contains("html") {
        HtmlVersion::Html5
    } else {
        HtmlVersion::Unknown
    }
}

// Classifies an href against the page URL
//
// Only absolute http(s) links can be external. A link is internal when it
// starts with base_url. This is a plain string prefix test: no trailing
// slash or redirect normalization happens.
//
// Examples (base_url = "http://site.com"):
//   "/about"                  -> Internal (no scheme)
//   "mailto:me@site.com"      -> Internal (no http scheme)
//   "http://site.com/docs"    -> Internal
//   "https://other.com/"      -> External
pub fn classify_link(href: &str, base_url: &str) -> LinkKind {
    if has_http_scheme(href) && !href.starts_with(base_url) {
        LinkKind::External
    } else {
        LinkKind::Internal
    }
}

fn has_http_scheme(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

// A form counts as a login form when its action or id mentions "login"
fn is_login_form(form: &Element) -> bool {
    form.attrs().any(|(name, value)| {
        (name == "action" || name == "id") && value.to_lowercase().contains("login")
    })
}
