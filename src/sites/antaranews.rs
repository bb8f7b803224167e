// src/sites/antaranews.rs

//! antaranews.com adapter.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use regex::Regex;
use scraper::Html;

use crate::error::{AppError, Result};
use crate::fetch::FetchRequest;
use crate::utils::date;

use super::{
    element_text, has_any_class, paragraph_text, parse_selector, search_url, select_first_text,
    ParsedArticle, SiteExtractor,
};

const BASE_URL: &str = "https://www.antaranews.com";

/// Crawls antaranews.com through its `/search` endpoint.
pub struct Antaranews;

impl SiteExtractor for Antaranews {
    fn name(&self) -> &'static str {
        "antaranews"
    }

    fn source(&self) -> &'static str {
        "antaranews.com"
    }

    fn concurrency(&self) -> Option<usize> {
        Some(7)
    }

    fn build_search_request(
        &self,
        keyword: &str,
        page: u32,
        _start_date: NaiveDateTime,
    ) -> FetchRequest {
        // https://www.antaranews.com/search?q=prabowo&page=1
        let params = [("q", keyword.to_string()), ("page", page.to_string())];
        FetchRequest::get(search_url(&format!("{BASE_URL}/search"), &params))
            .header("User-Agent", "Mozilla/5.0")
    }

    fn extract_links(&self, body: &str) -> Vec<String> {
        let Ok(link_sel) =
            parse_selector(".card__post.card__post-list.card__post__transition.mt-30 a")
        else {
            return Vec::new();
        };
        let Ok(article_pattern) = Regex::new(r"^https://www\.antaranews\.com/berita/") else {
            return Vec::new();
        };

        let doc = Html::parse_document(body);
        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for anchor in doc.select(&link_sel) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if !article_pattern.is_match(href) {
                continue;
            }
            if seen.insert(href.to_string()) {
                links.push(href.to_string());
            }
        }
        links
    }

    fn extract_article(&self, body: &str, link: &str) -> Result<ParsedArticle> {
        let title_sel = parse_selector(".wrap__article-detail-title")?;
        let author_sel = parse_selector(".text-muted.mt-2.small")?;
        let date_sel = parse_selector(".list-inline-item.mr-2")?;
        let category_sel = parse_selector(".breadcrumbs__item")?;
        let body_sel = parse_selector(".wrap__article-detail-content.post-content")?;
        let paragraph_sel = parse_selector("p, span")?;

        let doc = Html::parse_document(body);

        let title = select_first_text(&doc, &title_sel)
            .ok_or_else(|| AppError::extraction(link, "missing title"))?;

        // The publish date is the last list-inline item; earlier ones hold
        // the location and reporter line.
        let raw_date = doc
            .select(&date_sel)
            .last()
            .map(element_text)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::extraction(link, "missing publish date"))?;
        let publish_date = date::parse_flexible(&raw_date)
            .ok_or_else(|| AppError::extraction(link, format!("unparseable date '{raw_date}'")))?;

        let author = select_first_text(&doc, &author_sel);
        let category = doc.select(&category_sel).nth(1).map(element_text);

        let container = doc
            .select(&body_sel)
            .next()
            .ok_or_else(|| AppError::extraction(link, "missing article body"))?;
        let content = paragraph_text(container, &paragraph_sel, |element| {
            has_any_class(element, &["baca-juga", "text-muted"])
        });
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
