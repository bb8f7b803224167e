// src/output/mod.rs

//! Writing collected articles to disk.
//!
//! One [`RecordWriter`] per output format. Writes are atomic: the file is
//! written to a `.tmp` sibling first and renamed into place, so a crash
//! mid-write never leaves a truncated output file behind.

pub mod csv;
pub mod json;

pub use csv::CsvWriter;
pub use json::JsonWriter;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::Article;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// Serializes a batch of articles to one file.
#[async_trait]
pub trait RecordWriter: Send + Sync {
    async fn write(&self, articles: &[Article], path: &Path) -> Result<()>;
}

/// Writer for the given format.
pub fn writer_for(format: OutputFormat) -> Box<dyn RecordWriter> {
    match format {
        OutputFormat::Csv => Box::new(CsvWriter),
        OutputFormat::Json => Box::new(JsonWriter),
    }
}

/// Default output path: `output/news-watch-<keywords>-<timestamp>.<ext>`,
/// with the keyword list truncated so filenames stay manageable.
pub fn default_output_path(keywords: &str, format: OutputFormat) -> PathBuf {
    let short: String = keywords.chars().take(50).collect();
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from("output").join(format!(
        "news-watch-{short}-{stamp}.{}",
        format.extension()
    ))
}

/// Write bytes atomically: temp file first, then rename.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
