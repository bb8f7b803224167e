// src/crawl/testsite.rs

//! Minimal site adapter for engine tests, backed by wiremock.
//!
//! The wire format is plain text so fixtures stay readable: a search page is
//! one article URL per line, and an article page is `title|date|content` with
//! the date as `YYYY-MM-DD HH:MM`.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{AppError, Result};
use crate::fetch::FetchRequest;
use crate::sites::{ParsedArticle, SiteExtractor};

pub(crate) struct TestSite {
    base: String,
}

impl TestSite {
    pub(crate) fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Threshold used by all engine tests: articles from 2025 pass,
    /// 2024 articles trip the stop condition.
    pub(crate) fn start_date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }
}

impl SiteExtractor for TestSite {
    fn name(&self) -> &'static str {
        "testsite"
    }

    fn source(&self) -> &'static str {
        "test.example"
    }

    fn build_search_request(
        &self,
        keyword: &str,
        page: u32,
        _start_date: NaiveDateTime,
    ) -> FetchRequest {
        FetchRequest::get(format!("{}/search/{keyword}/{page}", self.base))
    }

    fn extract_links(&self, body: &str) -> Vec<String> {
        body.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn extract_article(&self, body: &str, link: &str) -> Result<ParsedArticle> {
        let mut parts = body.splitn(3, '|');
        let title = parts
            .next()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::extraction(link, "missing title"))?;
        let raw_date = parts
            .next()
            .ok_or_else(|| AppError::extraction(link, "missing date"))?;
        let publish_date = NaiveDateTime::parse_from_str(raw_date, "%Y-%m-%d %H:%M")
            .map_err(|e| AppError::extraction(link, format!("bad date '{raw_date}': {e}")))?;
        let content = parts.next().unwrap_or("isi").to_string();

        Ok(ParsedArticle {
            title: title.to_string(),
            publish_date,
            author: None,
            content,
            category: None,
        })
    }
}

/// Render an article page body in the test wire format.
pub(crate) fn article_body(title: &str, date: &str) -> String {
    format!("{title}|{date}|isi artikel")
}
