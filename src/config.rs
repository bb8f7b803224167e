// src/config.rs

//! Application configuration structures.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP fetching and retry behavior
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Result queue and collector behavior
    #[serde(default)]
    pub sink: SinkConfig,

    /// Run-level scheduling settings
    #[serde(default)]
    pub run: RunConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return defaults if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetch.user_agent is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if self.fetch.default_concurrency == 0 {
            return Err(AppError::validation(
                "fetch.default_concurrency must be > 0",
            ));
        }
        if self.sink.queue_capacity == 0 {
            return Err(AppError::validation("sink.queue_capacity must be > 0"));
        }
        if self.sink.wait_timeout_secs == 0 || self.sink.drain_timeout_secs == 0 {
            return Err(AppError::validation("sink timeouts must be > 0"));
        }
        if self.run.wall_clock_budget_secs == 0 {
            return Err(AppError::validation(
                "run.wall_clock_budget_secs must be > 0",
            ));
        }
        if let Some((site, _)) = self
            .run
            .concurrency_overrides
            .iter()
            .find(|(_, cap)| **cap == 0)
        {
            return Err(AppError::validation(format!(
                "run.concurrency_overrides.{site} must be > 0"
            )));
        }
        Ok(())
    }
}

/// HTTP client and retry behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Base per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Seconds added to the timeout on each retry, to tolerate slow endpoints
    #[serde(default = "defaults::timeout_increment")]
    pub timeout_increment_secs: u64,

    /// Number of retries after the initial attempt
    #[serde(default = "defaults::retry_budget")]
    pub retry_budget: u32,

    /// Backoff unit in milliseconds; attempt n sleeps `unit * 2^n`
    #[serde(default = "defaults::backoff_base")]
    pub backoff_base_ms: u64,

    /// Concurrency cap for sites without an override
    #[serde(default = "defaults::default_concurrency")]
    pub default_concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            timeout_increment_secs: defaults::timeout_increment(),
            retry_budget: defaults::retry_budget(),
            backoff_base_ms: defaults::backoff_base(),
            default_concurrency: defaults::default_concurrency(),
        }
    }
}

impl FetchConfig {
    /// Timeout for a given attempt, growing by the configured increment.
    pub fn timeout_for_attempt(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.timeout_secs + u64::from(attempt) * self.timeout_increment_secs)
    }

    /// Backoff delay before retrying after the given attempt.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }
}

/// Result queue and collector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Bounded queue capacity between walkers and the collector
    #[serde(default = "defaults::queue_capacity")]
    pub queue_capacity: usize,

    /// Per-pop timeout in seconds while jobs are still running
    #[serde(default = "defaults::wait_timeout")]
    pub wait_timeout_secs: u64,

    /// Per-pop timeout in seconds once all jobs have settled
    #[serde(default = "defaults::drain_timeout")]
    pub drain_timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            queue_capacity: defaults::queue_capacity(),
            wait_timeout_secs: defaults::wait_timeout(),
            drain_timeout_secs: defaults::drain_timeout(),
        }
    }
}

/// Run-level scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Wall-clock budget for a whole run, in seconds
    #[serde(default = "defaults::wall_clock_budget")]
    pub wall_clock_budget_secs: u64,

    /// Grace period for cooperative shutdown before tasks are aborted
    #[serde(default = "defaults::shutdown_grace")]
    pub shutdown_grace_secs: u64,

    /// Per-site concurrency cap overrides, keyed by site name
    #[serde(default)]
    pub concurrency_overrides: HashMap<String, usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            wall_clock_budget_secs: defaults::wall_clock_budget(),
            shutdown_grace_secs: defaults::shutdown_grace(),
            concurrency_overrides: HashMap::new(),
        }
    }
}

mod defaults {
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; newswatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn timeout_increment() -> u64 {
        5
    }
    pub fn retry_budget() -> u32 {
        3
    }
    pub fn backoff_base() -> u64 {
        1000
    }
    pub fn default_concurrency() -> usize {
        12
    }

    pub fn queue_capacity() -> usize {
        256
    }
    pub fn wait_timeout() -> u64 {
        60
    }
    pub fn drain_timeout() -> u64 {
        5
    }

    pub fn wall_clock_budget() -> u64 {
        300
    }
    pub fn shutdown_grace() -> u64 {
        10
    }
}
