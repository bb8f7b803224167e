// src/sites/bisnis.rs

//! bisnis.com adapter.

use std::collections::HashSet;
use std::time::Duration;

use chrono::NaiveDateTime;
use scraper::Html;
use url::Url;

use crate::error::{AppError, Result};
use crate::fetch::FetchRequest;
use crate::utils::date;

use super::{
    element_text, paragraph_text, parse_selector, search_url, select_first_text, ParsedArticle,
    SiteExtractor,
};

/// Crawls bisnis.com through its dedicated search host.
///
/// Search hits link through a `link?url=` redirector; the real article URL
/// is carried percent-encoded in the query string.
pub struct Bisnis;

impl SiteExtractor for Bisnis {
    fn name(&self) -> &'static str {
        "bisnis"
    }

    fn source(&self) -> &'static str {
        "bisnis.com"
    }

    fn concurrency(&self) -> Option<usize> {
        Some(5)
    }

    fn build_search_request(
        &self,
        keyword: &str,
        page: u32,
        _start_date: NaiveDateTime,
    ) -> FetchRequest {
        // https://search.bisnis.com/?q=prabowo&page=2
        let params = [("q", keyword.to_string()), ("page", page.to_string())];
        FetchRequest::get(search_url("https://search.bisnis.com/", &params))
            .header("User-Agent", "Mozilla/5.0")
            .timeout(Duration::from_secs(30))
    }

    fn extract_links(&self, body: &str) -> Vec<String> {
        let Ok(link_sel) = parse_selector("a.artLink.artLinkImg") else {
            return Vec::new();
        };

        let doc = Html::parse_document(body);
        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for anchor in doc.select(&link_sel) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(target) = decode_redirect(href) else {
                continue;
            };
            if seen.insert(target.clone()) {
                links.push(target);
            }
        }
        links
    }

    fn article_request(&self, link: &str) -> FetchRequest {
        FetchRequest::get(link).timeout(Duration::from_secs(30))
    }

    fn extract_article(&self, body: &str, link: &str) -> Result<ParsedArticle> {
        let title_sel = parse_selector("h1.detailsTitleCaption")?;
        let date_sel = parse_selector(".detailsAttributeDates")?;
        let author_sel = parse_selector(".authorName")?;
        let breadcrumb_sel = parse_selector(".breadcrumb .breadcrumbItem .breadcrumbLink")?;
        let body_sel = parse_selector("article.detailsContent.force-17.mt40")?;
        let paragraph_sel = parse_selector("p")?;

        let doc = Html::parse_document(body);

        let title = select_first_text(&doc, &title_sel)
            .ok_or_else(|| AppError::extraction(link, "missing title"))?;
        let raw_date = select_first_text(&doc, &date_sel)
            .ok_or_else(|| AppError::extraction(link, "missing publish date"))?;
        let publish_date = date::parse_flexible(&raw_date)
            .ok_or_else(|| AppError::extraction(link, format!("unparseable date '{raw_date}'")))?;

        // Byline renders as "Name - 5 minutes ago"; keep the name only.
        let author = select_first_text(&doc, &author_sel)
            .map(|raw| raw.split('-').next().unwrap_or(&raw).trim().to_string())
            .filter(|a| !a.is_empty());

        let category_parts: Vec<String> = doc
            .select(&breadcrumb_sel)
            .map(element_text)
            .filter(|t| !t.is_empty() && t != "Home")
            .collect();
        let category = if category_parts.is_empty() {
            None
        } else {
            Some(category_parts.join(" - "))
        };

        let container = doc
            .select(&body_sel)
            .next()
            .ok_or_else(|| AppError::extraction(link, "missing article body"))?;
        let content = paragraph_text(container, &paragraph_sel, |_| false);
        if content.is_empty() {
            return Err(AppError::extraction(link, "empty article body"));
        }

        Ok(ParsedArticle {
            title,
            publish_date,
            author,
            content,
            category,
        })
    }
}

/// Recover the article URL from a `link?url=` search redirect.
fn decode_redirect(href: &str) -> Option<String> {
    let parsed = Url::parse(href).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.to_string())
}
