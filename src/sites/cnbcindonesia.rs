// src/sites/cnbcindonesia.rs

//! cnbcindonesia.com adapter.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use scraper::Html;
use url::Url;

use crate::error::{AppError, Result};
use crate::fetch::FetchRequest;
use crate::utils::{self, date};

use super::{
    element_text, paragraph_text, parse_selector, search_url, select_first_text, ParsedArticle,
    SiteExtractor,
};

const BASE_URL: &str = "https://www.cnbcindonesia.com";

/// Crawls cnbcindonesia.com through its `/search` endpoint.
pub struct CnbcIndonesia;

impl SiteExtractor for CnbcIndonesia {
    fn name(&self) -> &'static str {
        "cnbcindonesia"
    }

    fn source(&self) -> &'static str {
        "cnbcindonesia.com"
    }

    fn concurrency(&self) -> Option<usize> {
        Some(5)
    }

    fn build_search_request(
        &self,
        keyword: &str,
        page: u32,
        start_date: NaiveDateTime,
    ) -> FetchRequest {
        // https://www.cnbcindonesia.com/search?query=&fromdate=&page=
        let params = [
            ("query", keyword.to_string()),
            ("fromdate", start_date.format("%Y/%m/%d").to_string()),
            ("page", page.to_string()),
        ];
        FetchRequest::get(search_url(&format!("{BASE_URL}/search"), &params))
    }

    fn extract_links(&self, body: &str) -> Vec<String> {
        let Ok(link_sel) = parse_selector(".nhl-list a.group[href]") else {
            return Vec::new();
        };
        let Ok(base) = Url::parse(BASE_URL) else {
            return Vec::new();
        };

        let doc = Html::parse_document(body);
        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for anchor in doc.select(&link_sel) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            // Result-list hrefs are occasionally site-relative.
            let target = utils::resolve_url(&base, href);
            if seen.insert(target.clone()) {
                links.push(target);
            }
        }
        links
    }

    fn extract_article(&self, body: &str, link: &str) -> Result<ParsedArticle> {
        let title_sel = parse_selector("h1.mb-4.text-32.font-extrabold")?;
        let author_sel = parse_selector("div.mb-1.text-base.font-semibold")?;
        let date_sel = parse_selector("div.text-cm.text-gray")?;
        let category_sel = parse_selector("a.text-xs.font-semibold")?;
        let body_sel = parse_selector("div.detail-text")?;
        let paragraph_sel = parse_selector("p")?;

        let doc = Html::parse_document(body);

        let title = select_first_text(&doc, &title_sel)
            .ok_or_else(|| AppError::extraction(link, "missing title"))?;
        let raw_date = select_first_text(&doc, &date_sel)
            .ok_or_else(|| AppError::extraction(link, "missing publish date"))?;
        let publish_date = date::parse_flexible(&raw_date)
            .ok_or_else(|| AppError::extraction(link, format!("unparseable date '{raw_date}'")))?;

        // The first font-semibold block is the program/desk name; the second
        // carries the byline.
        let author = doc
            .select(&author_sel)
            .nth(1)
            .map(element_text)
            .filter(|a| !a.is_empty());
        let category = doc.select(&category_sel).next().map(element_text);

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
