// src/models/mod.rs

//! Domain models for the crawler.

mod article;

pub use article::Article;

use chrono::NaiveDateTime;

/// One unit of crawl work: a (site, keyword) pair with its date threshold.
///
/// Identity is the (site, keyword) pair; the orchestrator never schedules the
/// same pair twice within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrawlJob {
    /// Registry name of the site to crawl
    pub site: String,

    /// Search keyword driving this crawl
    pub keyword: String,

    /// Articles older than this instant terminate the job's pagination
    pub start_date: NaiveDateTime,
}

/// Summary of one walker's crawl, returned when the job settles.
#[derive(Debug, Clone, Default)]
pub struct WalkerReport {
    pub site: String,
    pub keyword: String,

    /// Search pages fetched (strictly increasing page numbers)
    pub pages_fetched: u32,

    /// Records pushed to the sink
    pub articles_emitted: usize,

    /// Articles dropped: too old, fetch failure, or extraction failure
    pub articles_skipped: usize,

    /// Whether the date threshold ended pagination
    pub stopped_by_threshold: bool,
}

/// Summary of a whole run.
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// All collected records, in arbitrary arrival order
    pub articles: Vec<Article>,

    /// Jobs scheduled for this run
    pub jobs_total: usize,

    /// Jobs that ended with a panic or were aborted at the budget
    pub jobs_failed: usize,

    /// Per-job reports for jobs that settled normally
    pub reports: Vec<WalkerReport>,

    /// Non-fatal problems, e.g. unknown site names dropped at validation
    pub warnings: Vec<String>,
}

impl RunOutcome {
    /// True when no job could be scheduled at all. The run still returns an
    /// empty article list; callers decide how to surface the failure.
    pub fn is_failed_config(&self) -> bool {
        self.jobs_total == 0
    }
}
