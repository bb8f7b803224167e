// src/crawl/walker.rs

//! Per-job pagination state machine.
//!
//! One walker drives one (site, keyword) crawl: fetch a search page, extract
//! candidate links, fan out the article fetches under the site's concurrency
//! cap, then decide whether to continue to the next page. Search pages are
//! strictly sequential; page numbers only increase. The `continue_crawling`
//! flag is owned by this walker alone and is never shared across jobs.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::{mpsc, watch};

use crate::error::Result;
use crate::fetch::BoundedFetcher;
use crate::models::{Article, CrawlJob, WalkerReport};
use crate::sites::{ParsedArticle, SiteExtractor};

use super::sink::SinkMessage;

/// Drives one crawl job to completion.
pub struct PagedCrawlWalker {
    job: CrawlJob,
    site: Arc<dyn SiteExtractor>,
    fetcher: Arc<BoundedFetcher>,
    tx: mpsc::Sender<SinkMessage>,
    shutdown: watch::Receiver<bool>,
}

impl PagedCrawlWalker {
    pub fn new(
        job: CrawlJob,
        site: Arc<dyn SiteExtractor>,
        fetcher: Arc<BoundedFetcher>,
        tx: mpsc::Sender<SinkMessage>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            job,
            site,
            fetcher,
            tx,
            shutdown,
        }
    }

    /// Run the job until exhaustion, the date threshold, a search-page
    /// failure, or a shutdown signal. Always returns a report; a job never
    /// propagates an error to the run.
    pub async fn run(self) -> WalkerReport {
        let mut report = WalkerReport {
            site: self.job.site.clone(),
            keyword: self.job.keyword.clone(),
            ..WalkerReport::default()
        };

        let mut page: u32 = 1;
        let mut continue_crawling = true;

        while continue_crawling {
            // Shutdown is cooperative and only checked at page boundaries;
            // in-flight fetches are never interrupted mid-write.
            if *self.shutdown.borrow() {
                log::info!(
                    "[{}/{}] shutdown requested, stopping before page {page}",
                    self.job.site,
                    self.job.keyword
                );
                break;
            }

            let request =
                self.site
                    .build_search_request(&self.job.keyword, page, self.job.start_date);
            let body = match self.fetcher.fetch(&request).await {
                Ok(body) => body,
                Err(error) => {
                    // End of results for this job, not a run failure.
                    log::warn!(
                        "[{}/{}] search page {page} failed: {error}",
                        self.job.site,
                        self.job.keyword
                    );
                    break;
                }
            };
            report.pages_fetched += 1;

            let links = self.site.extract_links(&body);
            if links.is_empty() {
                log::debug!(
                    "[{}/{}] page {page} has no results, job exhausted",
                    self.job.site,
                    self.job.keyword
                );
                break;
            }

            if *self.shutdown.borrow() {
                break;
            }

            // Fan out the article fetches; siblings already scheduled keep
            // running even after the threshold trips. The fan-out width
            // matches the fetcher's admission cap.
            let mut articles = stream::iter(links)
                .map(|link| self.fetch_article(link))
                .buffer_unordered(self.fetcher.concurrency());

            while let Some((link, result)) = articles.next().await {
                match result {
                    Ok(parsed) => {
                        if parsed.publish_date < self.job.start_date {
                            continue_crawling = false;
                            report.stopped_by_threshold = true;
                            report.articles_skipped += 1;
                            log::debug!(
                                "[{}/{}] {link} older than threshold, finishing page then stopping",
                                self.job.site,
                                self.job.keyword
                            );
                            continue;
                        }
                        let record = self.to_record(parsed, link);
                        if self.tx.send(SinkMessage::Record(record)).await.is_err() {
                            log::warn!(
                                "[{}/{}] result queue closed, stopping job",
                                self.job.site,
                                self.job.keyword
                            );
                            return report;
                        }
                        report.articles_emitted += 1;
                    }
                    Err(error) => {
                        // One bad article never aborts the job.
                        log::warn!(
                            "[{}/{}] skipping {link}: {error}",
                            self.job.site,
                            self.job.keyword
                        );
                        report.articles_skipped += 1;
                    }
                }
            }

            page += 1;
        }

        log::info!(
            "[{}/{}] done: {} pages, {} emitted, {} skipped",
            self.job.site,
            self.job.keyword,
            report.pages_fetched,
            report.articles_emitted,
            report.articles_skipped
        );
        report
    }

    /// Fetch and extract one article page.
    async fn fetch_article(&self, link: String) -> (String, Result<ParsedArticle>) {
        let request = self.site.article_request(&link);
        match self.fetcher.fetch(&request).await {
            Ok(body) => {
                let parsed = self.site.extract_article(&body, &link);
                (link, parsed)
            }
            Err(error) => (link, Err(error.into())),
        }
    }

    fn to_record(&self, parsed: ParsedArticle, link: String) -> Article {
        Article {
            title: parsed.title,
            publish_date: parsed.publish_date,
            author: parsed.author,
            content: parsed.content,
            keyword: self.job.keyword.clone(),
            category: parsed.category,
            source: self.site.source().to_string(),
            link,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::crawl::testsite::{article_body, TestSite};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Arc<BoundedFetcher> {
        let config = FetchConfig {
            retry_budget: 0,
            backoff_base_ms: 1,
            ..FetchConfig::default()
        };
        Arc::new(BoundedFetcher::new(config, 4).unwrap())
    }

    fn job(site: &TestSite) -> CrawlJob {
        CrawlJob {
            site: site.name().to_string(),
            keyword: "ekonomi".to_string(),
            start_date: TestSite::start_date(),
        }
    }

    async fn run_walker(
        server: &MockServer,
    ) -> (WalkerReport, Vec<Article>) {
        let site = TestSite::new(server.uri());
        let job = job(&site);
        let (tx, mut rx) = mpsc::channel(64);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let walker =
            PagedCrawlWalker::new(job, Arc::new(site), fetcher(), tx, shutdown_rx);
        let report = walker.run().await;

        let mut articles = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let SinkMessage::Record(article) = message {
                articles.push(article);
            }
        }
        (report, articles)
    }

    fn mount_search(server: &MockServer, page: u32, links: &[String]) -> Mock {
        Mock::given(method("GET"))
            .and(path(format!("/search/ekonomi/{page}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(links.join("\n")))
    }

    #[tokio::test]
    async fn threshold_ends_pagination_after_current_page() {
        let server = MockServer::start().await;

        // Page 1: three fresh articles. Page 2: one fresh, one stale.
        // Page 3 must never be requested.
        let page1: Vec<String> = (1..=3).map(|n| format!("{}/article/{n}", server.uri())).collect();
        let page2: Vec<String> = (4..=5).map(|n| format!("{}/article/{n}", server.uri())).collect();
        mount_search(&server, 1, &page1).mount(&server).await;
        mount_search(&server, 2, &page2).mount(&server).await;
        mount_search(&server, 3, &[])
            .expect(0)
            .mount(&server)
            .await;

        for n in 1..=4u32 {
            Mock::given(method("GET"))
                .and(path(format!("/article/{n}")))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(article_body(&format!("Artikel {n}"), "2025-01-05 10:00")),
                )
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/article/5"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(article_body("Artikel lama", "2024-12-20 09:00")),
            )
            .mount(&server)
            .await;

        let (report, articles) = run_walker(&server).await;

        assert_eq!(report.pages_fetched, 2);
        assert!(report.stopped_by_threshold);
        assert_eq!(report.articles_emitted, 4);
        assert_eq!(report.articles_skipped, 1);
        assert_eq!(articles.len(), 4);
        assert!(articles.iter().all(|a| a.keyword == "ekonomi"));
        assert!(articles.iter().all(|a| a.publish_date >= TestSite::start_date()));
    }

    #[tokio::test]
    async fn empty_first_page_exhausts_the_job() {
        let server = MockServer::start().await;
        mount_search(&server, 1, &[]).mount(&server).await;
        mount_search(&server, 2, &[])
            .expect(0)
            .mount(&server)
            .await;

        let (report, articles) = run_walker(&server).await;
        assert_eq!(report.pages_fetched, 1);
        assert_eq!(report.articles_emitted, 0);
        assert!(!report.stopped_by_threshold);
        assert!(articles.is_empty());
    }

    #[tokio::test]
    async fn search_page_failure_ends_the_job_quietly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/ekonomi/1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (report, articles) = run_walker(&server).await;
        assert_eq!(report.pages_fetched, 0);
        assert!(articles.is_empty());
    }

    #[tokio::test]
    async fn single_article_failure_is_skipped_not_fatal() {
        let server = MockServer::start().await;
        let page1 = vec![
            format!("{}/article/1", server.uri()),
            format!("{}/article/2", server.uri()),
        ];
        mount_search(&server, 1, &page1).mount(&server).await;
        mount_search(&server, 2, &[]).mount(&server).await;

        Mock::given(method("GET"))
            .and(path("/article/1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/article/2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(article_body("Artikel utuh", "2025-01-05 10:00")),
            )
            .mount(&server)
            .await;

        let (report, articles) = run_walker(&server).await;
        // The job survives the bad article and still paginates onward.
        assert_eq!(report.pages_fetched, 2);
        assert_eq!(report.articles_emitted, 1);
        assert_eq!(report.articles_skipped, 1);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Artikel utuh");
    }

    #[tokio::test]
    async fn shutdown_before_start_fetches_nothing() {
        let server = MockServer::start().await;
        mount_search(&server, 1, &[])
            .expect(0)
            .mount(&server)
            .await;

        let site = TestSite::new(server.uri());
        let job = job(&site);
        let (tx, _rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();

        let walker =
            PagedCrawlWalker::new(job, Arc::new(site), fetcher(), tx, shutdown_rx);
        let report = walker.run().await;
        assert_eq!(report.pages_fetched, 0);
    }
}
