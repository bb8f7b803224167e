// src/crawl/orchestrator.rs

//! Fan-out/fan-in of crawl jobs under a wall-clock budget.
//!
//! The orchestrator expands keywords x sites into jobs, spawns one walker per
//! job, and collects their reports. The run ends when every job settles or
//! when the budget expires; on expiry walkers get a cooperative shutdown
//! signal, a grace period to finish their current page, and are aborted only
//! after that. The sink is started before any walker and torn down strictly
//! after the last one, so the sentinel is pushed exactly once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::fetch::BoundedFetcher;
use crate::models::{CrawlJob, RunOutcome, WalkerReport};
use crate::sites::{self, SiteExtractor};

use super::sink::ResultSink;
use super::walker::PagedCrawlWalker;

/// Everything one run needs: what to search for, where, and since when.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Search keywords; blanks are dropped, duplicates collapse to one job
    pub keywords: Vec<String>,

    /// Site selection; empty or "all"/"auto" selects every registered site
    pub sites: Vec<String>,

    /// Articles older than this instant end a job's pagination
    pub start_date: NaiveDateTime,

    /// Overrides the configured wall-clock budget for this run
    pub wall_clock_budget: Option<Duration>,
}

/// Runs crawl requests against a site registry.
pub struct CrawlOrchestrator {
    config: Arc<Config>,
    registry: HashMap<&'static str, Arc<dyn SiteExtractor>>,
}

impl CrawlOrchestrator {
    /// Orchestrator over the built-in site registry.
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_registry(config, sites::registry())
    }

    /// Orchestrator over an explicit registry.
    pub fn with_registry(
        config: Arc<Config>,
        registry: HashMap<&'static str, Arc<dyn SiteExtractor>>,
    ) -> Self {
        Self { config, registry }
    }

    /// Execute one crawl run to completion or budget expiry.
    ///
    /// Returns `Err` only for invalid input (bad configuration, no usable
    /// keyword). Everything that goes wrong inside the run degrades to
    /// warnings, failed-job counts, or skipped articles instead.
    pub async fn run(&self, request: RunRequest) -> Result<RunOutcome> {
        self.config.validate()?;

        let keywords = dedup_keywords(&request.keywords);
        if keywords.is_empty() {
            return Err(AppError::validation("no usable keyword in request"));
        }

        let mut outcome = RunOutcome::default();

        let (sites, unknown) = sites::resolve_sites(&request.sites, &self.registry);
        for name in unknown {
            log::warn!("Unknown site '{name}' dropped from run");
            outcome.warnings.push(format!("unknown site '{name}'"));
        }
        if sites.is_empty() {
            // Nothing to schedule. Not a crash; callers check
            // `is_failed_config` to decide the exit status.
            log::error!("Site selection resolved to zero sites, nothing to do");
            return Ok(outcome);
        }

        let fetchers = self.build_fetchers(&sites)?;

        let budget = request
            .wall_clock_budget
            .unwrap_or(Duration::from_secs(self.config.run.wall_clock_budget_secs));
        let deadline = Instant::now() + budget;

        // Sink first, walkers second: no record can arrive before the
        // collector is listening.
        let sink = ResultSink::start(&self.config.sink);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut walkers = JoinSet::new();
        let mut scheduled = HashSet::new();
        for site in &sites {
            for keyword in &keywords {
                let job = CrawlJob {
                    site: site.name().to_string(),
                    keyword: keyword.clone(),
                    start_date: request.start_date,
                };
                if !scheduled.insert(job.clone()) {
                    continue;
                }
                let walker = PagedCrawlWalker::new(
                    job,
                    Arc::clone(site),
                    Arc::clone(&fetchers[site.name()]),
                    sink.sender(),
                    shutdown_rx.clone(),
                );
                walkers.spawn(walker.run());
            }
        }
        outcome.jobs_total = walkers.len();
        log::info!(
            "Run started: {} jobs over {} sites, budget {:?}",
            outcome.jobs_total,
            sites.len(),
            budget
        );

        self.join_walkers(&mut walkers, deadline, &shutdown_tx, &mut outcome)
            .await;

        sink.signal_jobs_done();
        sink.push_sentinel().await;
        outcome.articles = sink.finish().await;

        log::info!(
            "Run finished: {} articles, {}/{} jobs failed",
            outcome.articles.len(),
            outcome.jobs_failed,
            outcome.jobs_total
        );
        Ok(outcome)
    }

    /// One fetcher per site, shared by all of that site's jobs so the
    /// admission gate caps the site as a whole. The cap resolves as
    /// run override, then adapter pin, then `fetch.default_concurrency`.
    fn build_fetchers(
        &self,
        sites: &[Arc<dyn SiteExtractor>],
    ) -> Result<HashMap<&'static str, Arc<BoundedFetcher>>> {
        let mut fetchers = HashMap::new();
        for site in sites {
            let cap = self
                .config
                .run
                .concurrency_overrides
                .get(site.name())
                .copied()
                .or_else(|| site.concurrency())
                .unwrap_or(self.config.fetch.default_concurrency);
            let fetcher = BoundedFetcher::new(self.config.fetch.clone(), cap)?;
            fetchers.insert(site.name(), Arc::new(fetcher));
        }
        Ok(fetchers)
    }

    /// Collect walker reports until all settle or the deadline passes; then
    /// signal shutdown, wait out the grace period, and abort stragglers.
    async fn join_walkers(
        &self,
        walkers: &mut JoinSet<WalkerReport>,
        deadline: Instant,
        shutdown_tx: &watch::Sender<bool>,
        outcome: &mut RunOutcome,
    ) {
        loop {
            match timeout_at(deadline, walkers.join_next()).await {
                Ok(Some(Ok(report))) => outcome.reports.push(report),
                Ok(Some(Err(error))) => {
                    log::error!("Crawl job panicked: {error}");
                    outcome.jobs_failed += 1;
                }
                Ok(None) => return,
                Err(_) => break,
            }
        }

        let remaining = walkers.len();
        log::warn!("Run budget exhausted with {remaining} jobs still running");
        let _ = shutdown_tx.send(true);

        let grace =
            Instant::now() + Duration::from_secs(self.config.run.shutdown_grace_secs);
        loop {
            match timeout_at(grace, walkers.join_next()).await {
                Ok(Some(Ok(report))) => outcome.reports.push(report),
                Ok(Some(Err(error))) => {
                    log::error!("Crawl job panicked during shutdown: {error}");
                    outcome.jobs_failed += 1;
                }
                Ok(None) => return,
                Err(_) => break,
            }
        }

        // Whatever survived the grace period gets cut off.
        outcome.jobs_failed += walkers.len();
        walkers.abort_all();
        while walkers.join_next().await.is_some() {}
    }
}

fn dedup_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::testsite::{article_body, TestSite};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> Arc<Config> {
        let mut config = Config::default();
        config.fetch.retry_budget = 0;
        config.fetch.backoff_base_ms = 1;
        config.sink.wait_timeout_secs = 2;
        config.sink.drain_timeout_secs = 1;
        config.run.shutdown_grace_secs = 1;
        Arc::new(config)
    }

    fn test_registry(base: &str) -> HashMap<&'static str, Arc<dyn SiteExtractor>> {
        let site: Arc<dyn SiteExtractor> = Arc::new(TestSite::new(base));
        HashMap::from([(site.name(), site)])
    }

    fn request(sites: Vec<&str>, keywords: Vec<&str>) -> RunRequest {
        RunRequest {
            keywords: keywords.into_iter().map(str::to_string).collect(),
            sites: sites.into_iter().map(str::to_string).collect(),
            start_date: TestSite::start_date(),
            wall_clock_budget: None,
        }
    }

    async fn mount_pages(server: &MockServer, keyword: &str, links: &[String]) {
        Mock::given(method("GET"))
            .and(path(format!("/search/{keyword}/1")))
            .respond_with(ResponseTemplate::new(200).set_body_string(links.join("\n")))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/search/{keyword}/2")))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn run_collects_articles_for_every_job() {
        let server = MockServer::start().await;
        let links_a = vec![
            format!("{}/article/a1", server.uri()),
            format!("{}/article/a2", server.uri()),
        ];
        let links_b = vec![format!("{}/article/b1", server.uri())];
        mount_pages(&server, "ihsg", &links_a).await;
        mount_pages(&server, "rupiah", &links_b).await;
        for name in ["a1", "a2", "b1"] {
            Mock::given(method("GET"))
                .and(path(format!("/article/{name}")))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(article_body(name, "2025-03-01 12:00")),
                )
                .mount(&server)
                .await;
        }

        let orchestrator =
            CrawlOrchestrator::with_registry(test_config(), test_registry(&server.uri()));
        let outcome = orchestrator
            .run(request(vec!["testsite"], vec!["ihsg", "rupiah"]))
            .await
            .unwrap();

        assert_eq!(outcome.jobs_total, 2);
        assert_eq!(outcome.jobs_failed, 0);
        assert_eq!(outcome.articles.len(), 3);
        assert_eq!(outcome.reports.len(), 2);
        assert!(outcome
            .articles
            .iter()
            .all(|a| a.source == "test.example"));
        let ihsg = outcome
            .reports
            .iter()
            .find(|r| r.keyword == "ihsg")
            .unwrap();
        assert_eq!(ihsg.articles_emitted, 2);
    }

    #[tokio::test]
    async fn unknown_site_becomes_warning_and_valid_site_still_runs() {
        let server = MockServer::start().await;
        mount_pages(&server, "ihsg", &[]).await;

        let orchestrator =
            CrawlOrchestrator::with_registry(test_config(), test_registry(&server.uri()));
        let outcome = orchestrator
            .run(request(vec!["nosuchsite", "testsite"], vec!["ihsg"]))
            .await
            .unwrap();

        assert_eq!(outcome.jobs_total, 1);
        assert_eq!(outcome.warnings, vec!["unknown site 'nosuchsite'".to_string()]);
        assert!(!outcome.is_failed_config());
    }

    #[tokio::test]
    async fn zero_valid_sites_is_failed_config_not_an_error() {
        let orchestrator =
            CrawlOrchestrator::with_registry(test_config(), test_registry("http://unused"));
        let outcome = orchestrator
            .run(request(vec!["nosuchsite"], vec!["ihsg"]))
            .await
            .unwrap();

        assert!(outcome.is_failed_config());
        assert!(outcome.articles.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[tokio::test]
    async fn blank_keywords_are_rejected() {
        let orchestrator =
            CrawlOrchestrator::with_registry(test_config(), test_registry("http://unused"));
        let result = orchestrator
            .run(request(vec!["testsite"], vec!["  ", ""]))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn duplicate_keywords_collapse_to_one_job() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/ihsg/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .expect(1)
            .mount(&server)
            .await;

        let orchestrator =
            CrawlOrchestrator::with_registry(test_config(), test_registry(&server.uri()));
        let outcome = orchestrator
            .run(request(vec!["testsite"], vec!["ihsg", " ihsg "]))
            .await
            .unwrap();
        assert_eq!(outcome.jobs_total, 1);
    }

    #[tokio::test]
    async fn default_concurrency_bounds_article_fetches() {
        let server = MockServer::start().await;
        let links = vec![
            format!("{}/article/a1", server.uri()),
            format!("{}/article/a2", server.uri()),
        ];
        mount_pages(&server, "ihsg", &links).await;
        for name in ["a1", "a2"] {
            Mock::given(method("GET"))
                .and(path(format!("/article/{name}")))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(article_body(name, "2025-03-01 12:00"))
                        .set_delay(Duration::from_millis(150)),
                )
                .mount(&server)
                .await;
        }

        let mut config = Config::default();
        config.fetch.retry_budget = 0;
        config.fetch.default_concurrency = 1;
        config.sink.drain_timeout_secs = 1;

        let orchestrator = CrawlOrchestrator::with_registry(
            Arc::new(config),
            test_registry(&server.uri()),
        );
        let started = std::time::Instant::now();
        let outcome = orchestrator
            .run(request(vec!["testsite"], vec!["ihsg"]))
            .await
            .unwrap();

        assert_eq!(outcome.articles.len(), 2);
        // With a cap of 1 the two 150ms article fetches cannot overlap.
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn budget_expiry_aborts_stuck_jobs() {
        let server = MockServer::start().await;
        // The search hangs far past the budget and the grace period.
        Mock::given(method("GET"))
            .and(path("/search/ihsg/1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("")
                    .set_delay(Duration::from_secs(8)),
            )
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.fetch.retry_budget = 0;
        config.sink.drain_timeout_secs = 1;
        config.run.shutdown_grace_secs = 0;

        let orchestrator = CrawlOrchestrator::with_registry(
            Arc::new(config),
            test_registry(&server.uri()),
        );
        let mut req = request(vec!["testsite"], vec!["ihsg"]);
        req.wall_clock_budget = Some(Duration::from_millis(200));

        let started = std::time::Instant::now();
        let outcome = orchestrator.run(req).await.unwrap();

        assert_eq!(outcome.jobs_total, 1);
        assert_eq!(outcome.jobs_failed, 1);
        assert!(outcome.articles.is_empty());
        // Budget + grace + drain, with slack; never the full 8s delay.
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
