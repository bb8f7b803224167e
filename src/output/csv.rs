// src/output/csv.rs

//! CSV output.
//!
//! Every field is quoted so commas and newlines inside article bodies never
//! break the row structure. Rows are CRLF-terminated per RFC 4180.

use std::path::Path;

use async_trait::async_trait;
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::error::Result;
use crate::models::Article;

use super::{write_atomic, RecordWriter};

const HEADER: [&str; 8] = [
    "title",
    "publish_date",
    "author",
    "content",
    "keyword",
    "category",
    "source",
    "link",
];

pub struct CsvWriter;

#[async_trait]
impl RecordWriter for CsvWriter {
    async fn write(&self, articles: &[Article], path: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::CRLF)
            .from_writer(Vec::new());

        writer.write_record(HEADER)?;
        for article in articles {
            writer.write_record([
                article.title.as_str(),
                &article.publish_date_str(),
                article.author.as_deref().unwrap_or(""),
                article.content.as_str(),
                article.keyword.as_str(),
                article.category.as_deref().unwrap_or(""),
                article.source.as_str(),
                article.link.as_str(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        write_atomic(path, &bytes).await?;
        log::info!("Wrote {} records to {}", articles.len(), path.display());
        Ok(())
    }
}
