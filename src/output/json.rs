// src/output/json.rs

//! JSON output: the whole batch as one pretty-printed array.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Article;

use super::{write_atomic, RecordWriter};

pub struct JsonWriter;

#[async_trait]
impl RecordWriter for JsonWriter {
    async fn write(&self, articles: &[Article], path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(articles)?;
        write_atomic(path, &bytes).await?;
        log::info!("Wrote {} records to {}", articles.len(), path.display());
        Ok(())
    }
}
