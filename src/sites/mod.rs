// src/sites/mod.rs

//! Per-site search and extraction adapters.
//!
//! Each supported news site implements [`SiteExtractor`]: how to build a
//! search-results request for a keyword and page, how to pull candidate
//! article links out of a results page, and how to turn an article page into
//! a [`ParsedArticle`]. Adapters are stateless; all crawl state lives in the
//! walker that drives them.

mod antaranews;
mod bisnis;
mod cnbcindonesia;
mod detik;

pub use antaranews::Antaranews;
pub use bisnis::Bisnis;
pub use cnbcindonesia::CnbcIndonesia;
pub use detik::Detik;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDateTime;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::fetch::FetchRequest;

/// Article fields produced by an extractor, before the walker attaches the
/// keyword and link.
#[derive(Debug, Clone)]
pub struct ParsedArticle {
    pub title: String,
    pub publish_date: NaiveDateTime,
    pub author: Option<String>,
    pub content: String,
    pub category: Option<String>,
}

/// Search and extraction behavior for one news site.
pub trait SiteExtractor: Send + Sync {
    /// Registry name, also used in CLI site selection.
    fn name(&self) -> &'static str;

    /// Source identifier stamped onto records (host without "www.").
    fn source(&self) -> &'static str;

    /// Concurrency cap this site tolerates, when the adapter pins one.
    /// `None` defers to the configured `fetch.default_concurrency`.
    fn concurrency(&self) -> Option<usize> {
        None
    }

    /// Build the search-results request for a keyword and page number.
    fn build_search_request(
        &self,
        keyword: &str,
        page: u32,
        start_date: NaiveDateTime,
    ) -> FetchRequest;

    /// Pull candidate article links from a raw search-results page.
    ///
    /// An empty result means the site has no more results for this keyword.
    fn extract_links(&self, body: &str) -> Vec<String>;

    /// Build the request for one article page.
    fn article_request(&self, link: &str) -> FetchRequest {
        FetchRequest::get(link)
    }

    /// Turn a raw article page into structured fields.
    fn extract_article(&self, body: &str, link: &str) -> Result<ParsedArticle>;
}

/// Build the registry of all supported sites.
pub fn registry() -> HashMap<&'static str, Arc<dyn SiteExtractor>> {
    let sites: Vec<Arc<dyn SiteExtractor>> = vec![
        Arc::new(Antaranews),
        Arc::new(Bisnis),
        Arc::new(CnbcIndonesia),
        Arc::new(Detik),
    ];
    sites.into_iter().map(|site| (site.name(), site)).collect()
}

/// Resolve a user site selection against a registry.
///
/// An empty selection or any "all"/"auto" entry selects every registered
/// site. Unknown names are returned separately so the caller can warn and
/// proceed; duplicates resolve to a single adapter.
pub fn resolve_sites(
    selection: &[String],
    registry: &HashMap<&'static str, Arc<dyn SiteExtractor>>,
) -> (Vec<Arc<dyn SiteExtractor>>, Vec<String>) {
    let wants_all = selection.is_empty()
        || selection
            .iter()
            .any(|s| s.eq_ignore_ascii_case("all") || s.eq_ignore_ascii_case("auto"));

    if wants_all {
        let mut sites: Vec<_> = registry.values().cloned().collect();
        sites.sort_by_key(|site| site.name());
        return (sites, Vec::new());
    }

    let mut sites = Vec::new();
    let mut unknown = Vec::new();
    let mut seen = HashSet::new();
    for name in selection {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        match registry.get(key.as_str()) {
            Some(site) => {
                if seen.insert(site.name()) {
                    sites.push(Arc::clone(site));
                }
            }
            None => unknown.push(key),
        }
    }
    (sites, unknown)
}

pub(crate) fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Build `base?key=value&…` with percent-encoded query parameters.
pub(crate) fn search_url(base: &str, params: &[(&str, String)]) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
        .finish();
    format!("{base}?{query}")
}

/// Whitespace-normalized text content of an element.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first element matching `selector`, if any.
pub(crate) fn select_first_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Collect paragraph texts under `container`, skipping elements for which
/// `skip` returns true, joined with newlines.
pub(crate) fn paragraph_text<F>(container: ElementRef<'_>, paragraphs: &Selector, skip: F) -> String
where
    F: Fn(ElementRef<'_>) -> bool,
{
    let mut parts = Vec::new();
    for paragraph in container.select(paragraphs) {
        if skip(paragraph) {
            continue;
        }
        let text = element_text(paragraph);
        if !text.is_empty() {
            parts.push(text);
        }
    }
    parts.join("\n")
}

/// True when the element carries any of the given classes.
pub(crate) fn has_any_class(element: ElementRef<'_>, classes: &[&str]) -> bool {
    element
        .value()
        .classes()
        .any(|c| classes.contains(&c))
}
