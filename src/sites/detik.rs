// src/sites/detik.rs

//! detik.com adapter.

use std::collections::HashSet;

use chrono::{Local, NaiveDateTime};
use regex::Regex;
use scraper::Html;

use crate::error::{AppError, Result};
use crate::fetch::FetchRequest;
use crate::utils::date;

use super::{
    element_text, paragraph_text, parse_selector, search_url, select_first_text, ParsedArticle,
    SiteExtractor,
};

const BASE_URL: &str = "https://www.detik.com";

/// Crawls detik.com through its `searchnews` endpoint.
pub struct Detik;

impl SiteExtractor for Detik {
    fn name(&self) -> &'static str {
        "detik"
    }

    fn source(&self) -> &'static str {
        "detik.com"
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
        // https://www.detik.com/search/searchnews?query=&page=&result_type=latest&fromdatex=&todatex=
        let params = [
            ("query", keyword.to_string()),
            ("page", page.to_string()),
            ("result_type", "latest".to_string()),
            ("fromdatex", start_date.format("%d/%m/%Y").to_string()),
            (
                "todatex",
                Local::now().date_naive().format("%d/%m/%Y").to_string(),
            ),
        ];
        FetchRequest::get(search_url(
            &format!("{BASE_URL}/search/searchnews"),
            &params,
        ))
    }

    fn extract_links(&self, body: &str) -> Vec<String> {
        let Ok(link_sel) = parse_selector(".list-content__item .media__link") else {
            return Vec::new();
        };
        let Ok(article_pattern) = Regex::new(r"\.detik\.com/.*/d-\d+") else {
            return Vec::new();
        };

        let doc = Html::parse_document(body);
        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for anchor in doc.select(&link_sel) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if !article_pattern.is_match(href)
                || href.contains("wolipop.detik.com")
                || href.contains("/detiktv/")
                || href.contains("/pop/")
            {
                continue;
            }
            if seen.insert(href.to_string()) {
                links.push(href.to_string());
            }
        }
        links
    }

    fn article_request(&self, link: &str) -> FetchRequest {
        // single=1 renders multi-page articles on one page
        FetchRequest::get(format!("{link}?single=1"))
    }

    fn extract_article(&self, body: &str, link: &str) -> Result<ParsedArticle> {
        let title_sel = parse_selector(".detail__title")?;
        let author_sel = parse_selector(".detail__author")?;
        let date_sel = parse_selector(".detail__date")?;
        let category_sel = parse_selector(".page__breadcrumb a")?;
        let body_sel = parse_selector(".detail__body-text")?;
        let paragraph_sel = parse_selector("p")?;

        let doc = Html::parse_document(body);

        let title = select_first_text(&doc, &title_sel)
            .ok_or_else(|| AppError::extraction(link, "missing title"))?;
        let raw_date = select_first_text(&doc, &date_sel)
            .ok_or_else(|| AppError::extraction(link, "missing publish date"))?;
        let publish_date = date::parse_flexible(&raw_date)
            .ok_or_else(|| AppError::extraction(link, format!("unparseable date '{raw_date}'")))?;

        let author = select_first_text(&doc, &author_sel);
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
