// src/crawl/mod.rs

//! The concurrent crawl engine.
//!
//! - [`sink`]: bounded result queue drained by a collector task
//! - [`walker`]: the per-(site, keyword) pagination state machine
//! - [`orchestrator`]: fan-out/fan-in of all walkers under a run budget

pub mod orchestrator;
pub mod sink;
pub mod walker;

pub use orchestrator::{CrawlOrchestrator, RunRequest};
pub use sink::{ResultSink, SinkMessage};
pub use walker::PagedCrawlWalker;

#[cfg(test)]
pub(crate) mod testsite;
