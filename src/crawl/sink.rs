// src/crawl/sink.rs

//! Bounded result queue and its collector task.
//!
//! Walkers push records through a bounded channel; a dedicated collector
//! drains it into the final list. Termination is coordinated by a tagged
//! completion sentinel plus an adaptive per-pop timeout: patient while jobs
//! are still running, short once the orchestrator signals that every job has
//! settled, so the collector can never block indefinitely on a queue that
//! will receive no more items.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::SinkConfig;
use crate::models::Article;

/// A queue message: either one record, or the end-of-stream sentinel.
///
/// The sentinel is a distinct tagged value so no legitimate record field can
/// ever be misread as end-of-stream.
#[derive(Debug)]
pub enum SinkMessage {
    Record(Article),
    Done,
}

/// The result sink: a bounded queue plus the collector draining it.
pub struct ResultSink {
    tx: mpsc::Sender<SinkMessage>,
    done_tx: watch::Sender<bool>,
    collector: JoinHandle<Vec<Article>>,
}

impl ResultSink {
    /// Spawn the collector. Called before any producer is scheduled so no
    /// early record can be lost.
    pub fn start(config: &SinkConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let (done_tx, done_rx) = watch::channel(false);
        let wait = Duration::from_secs(config.wait_timeout_secs);
        let drain = Duration::from_secs(config.drain_timeout_secs);
        let collector = tokio::spawn(collect(rx, done_rx, wait, drain));
        Self {
            tx,
            done_tx,
            collector,
        }
    }

    /// A producer handle for one walker.
    pub fn sender(&self) -> mpsc::Sender<SinkMessage> {
        self.tx.clone()
    }

    /// Tell the collector that all jobs have settled; it switches to the
    /// short drain timeout.
    pub fn signal_jobs_done(&self) {
        let _ = self.done_tx.send(true);
    }

    /// Push the completion sentinel. The orchestrator calls this exactly
    /// once, strictly after every walker has terminated.
    pub async fn push_sentinel(&self) {
        if self.tx.send(SinkMessage::Done).await.is_err() {
            log::debug!("Collector already stopped before the sentinel arrived");
        }
    }

    /// Await the collector's final list.
    pub async fn finish(self) -> Vec<Article> {
        drop(self.tx);
        match self.collector.await {
            Ok(articles) => articles,
            Err(error) => {
                log::error!("Collector task failed: {error}");
                Vec::new()
            }
        }
    }
}

async fn collect(
    mut rx: mpsc::Receiver<SinkMessage>,
    done_rx: watch::Receiver<bool>,
    wait: Duration,
    drain: Duration,
) -> Vec<Article> {
    let mut articles = Vec::new();
    loop {
        let limit = if *done_rx.borrow() { drain } else { wait };
        match tokio::time::timeout(limit, rx.recv()).await {
            Ok(Some(SinkMessage::Record(article))) => articles.push(article),
            Ok(Some(SinkMessage::Done)) => {
                log::debug!("Sentinel received; {} records collected", articles.len());
                break;
            }
            // All producer handles dropped; nothing more can arrive.
            Ok(None) => break,
            Err(_) => {
                if *done_rx.borrow() {
                    log::debug!(
                        "Drain timeout after completion signal; {} records collected",
                        articles.len()
                    );
                    break;
                }
                log::debug!("Still waiting for producers; {} records so far", articles.len());
            }
        }
    }
    articles
}
