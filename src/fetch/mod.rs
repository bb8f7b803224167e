// src/fetch/mod.rs

//! Bounded HTTP fetching with retry and backoff.
//!
//! The fetcher owns the per-site admission gate: at most `concurrency`
//! requests for one site are in flight at a time, and a retry re-enters the
//! gate instead of holding its slot across the backoff sleep. Failures are
//! classified into [`FetchError`] values; nothing panics past this boundary.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::FetchConfig;
use crate::error::Result;

/// HTTP method for a fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An immutable description of one HTTP request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub form: Option<Vec<(String, String)>>,

    /// Overrides the configured base timeout for this request
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    /// Build a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            form: None,
            timeout: None,
        }
    }

    /// Build a POST request with form-encoded fields.
    pub fn post(url: impl Into<String>, form: Vec<(String, String)>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            form: Some(form),
            timeout: None,
        }
    }

    /// Attach a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a per-request base timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Classified fetch failure. Always a value, never a panic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request exceeded its per-attempt timeout
    #[error("request timed out")]
    Timeout,

    /// HTTP 5xx from the server
    #[error("server error HTTP {0}")]
    ServerError(u16),

    /// HTTP 429, treated as retryable
    #[error("rate limited (HTTP 429)")]
    RateLimited,

    /// HTTP 4xx other than 429, not retried
    #[error("client error HTTP {0}")]
    ClientError(u16),

    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),

    /// Retry budget exhausted; `last` describes the final attempt's failure
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl FetchError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout
                | FetchError::ServerError(_)
                | FetchError::RateLimited
                | FetchError::Network(_)
        )
    }
}

/// Result type for a single fetch: the raw body, or a classified failure.
pub type FetchOutcome = std::result::Result<String, FetchError>;

/// HTTP fetcher with a per-site concurrency cap and bounded retries.
///
/// Holds no crawl state; one instance is built per site per run.
pub struct BoundedFetcher {
    client: Client,
    gate: Arc<Semaphore>,
    cap: usize,
    config: FetchConfig,
}

impl BoundedFetcher {
    /// Create a fetcher capped at `concurrency` in-flight requests.
    pub fn new(config: FetchConfig, concurrency: usize) -> Result<Self> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;
        let cap = concurrency.max(1);
        Ok(Self {
            client,
            gate: Arc::new(Semaphore::new(cap)),
            cap,
            config,
        })
    }

    /// The in-flight request cap this fetcher admits.
    pub fn concurrency(&self) -> usize {
        self.cap
    }

    /// Execute a request under the admission gate.
    ///
    /// Retryable failures (timeout, 5xx, 429, network) are re-attempted up to
    /// `retry_budget` times with exponential backoff; the attempt's gate slot
    /// is released before the sleep. Non-retryable failures return
    /// immediately. The per-attempt timeout grows by the configured increment
    /// so persistently slow endpoints still get a chance.
    pub async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        let mut attempt = 0u32;
        loop {
            match self.attempt(request, attempt).await {
                Ok(body) => return Ok(body),
                Err(error) if error.is_retryable() => {
                    if attempt >= self.config.retry_budget {
                        return Err(FetchError::RetriesExhausted {
                            attempts: attempt + 1,
                            last: error.to_string(),
                        });
                    }
                    log::warn!(
                        "Retry {}/{} for {}: {}",
                        attempt + 1,
                        self.config.retry_budget,
                        request.url,
                        error
                    );
                    tokio::time::sleep(self.config.backoff_for_attempt(attempt)).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// One attempt: acquire a gate slot, send, classify.
    async fn attempt(&self, request: &FetchRequest, attempt: u32) -> FetchOutcome {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| FetchError::Network("admission gate closed".to_string()))?;

        let timeout = match request.timeout {
            Some(base) => {
                base + Duration::from_secs(
                    u64::from(attempt) * self.config.timeout_increment_secs,
                )
            }
            None => self.config.timeout_for_attempt(attempt),
        };

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }

        let response = builder
            .timeout(timeout)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        response.text().await.map_err(classify_transport)
    }
}

fn classify_transport(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(error.to_string())
    }
}

fn classify_status(status: StatusCode) -> FetchError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        FetchError::RateLimited
    } else if status.is_server_error() {
        FetchError::ServerError(status.as_u16())
    } else if status.is_client_error() {
        FetchError::ClientError(status.as_u16())
    } else {
        FetchError::Network(format!("unexpected HTTP {status}"))
    }
}
