//! Article data structure.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A structured article record produced by a site extractor.
///
/// `publish_date` is normalized to a timezone-naive instant; `link` is the
/// canonical URL and serves as the record's identity for downstream
/// consumers. Field order matches the writer contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
    /// Article headline
    pub title: String,

    /// Publication instant, timezone-naive
    pub publish_date: NaiveDateTime,

    /// Author byline, when the site exposes one
    pub author: Option<String>,

    /// Cleaned body text
    pub content: String,

    /// Keyword whose search produced this record
    pub keyword: String,

    /// Site section/category, when available
    pub category: Option<String>,

    /// Source site identifier (host without "www.")
    pub source: String,

    /// Canonical article URL
    pub link: String,
}

impl Article {
    /// `publish_date` formatted the way the writers emit it.
    pub fn publish_date_str(&self) -> String {
        self.publish_date.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_article() -> Article {
        Article {
            title: "IHSG Menguat".to_string(),
            publish_date: NaiveDate::from_ymd_opt(2025, 5, 5)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
            author: Some("Redaksi".to_string()),
            content: "Indeks harga saham gabungan menguat.".to_string(),
            keyword: "ihsg".to_string(),
            category: Some("Ekonomi".to_string()),
            source: "detik.com".to_string(),
            link: "https://finance.detik.com/bursa-dan-valas/d-100/ihsg".to_string(),
        }
    }

    #[test]
    fn test_publish_date_format() {
        let article = sample_article();
        assert_eq!(article.publish_date_str(), "2025-05-05 10:30:00");
    }

    #[test]
    fn test_serde_roundtrip_keeps_link_identity() {
        let article = sample_article();
        let json = serde_json::to_string(&article).unwrap();
        let back: Article = serde_json::from_str(&json).unwrap();
        assert_eq!(back.link, article.link);
        assert_eq!(back, article);
    }
}
