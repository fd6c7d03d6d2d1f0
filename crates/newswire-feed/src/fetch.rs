//! Retrying HTTP fetcher
//!
//! One remote file fetch produces a [`FetchOutcome`], never an error: a 404
//! is a benign, expected outcome for sparse feeds and is not retried, while
//! transient network failures are retried with exponential backoff before
//! being demoted to `Failed`.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of fetching one remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Body bytes of a 2xx response
    Fetched(Vec<u8>),
    /// Upstream has no file for this slot (404)
    NotFound,
    /// Transient failures exhausted the retry budget
    Failed(String),
}

/// Retry budget and backoff curve for transient failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_base: Duration::from_secs(2),
            backoff_cap: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Sleep before retrying after the given 1-based failed attempt:
    /// base * 2^(attempt-1), capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let raw = self.backoff_base.saturating_mul(1u32 << exp);
        raw.min(self.backoff_cap)
    }
}

/// The fetch seam of the pipeline. Production code uses [`Fetcher`];
/// tests substitute deterministic stubs.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> FetchOutcome;
}

/// A small pool of real browser signatures, rotated per attempt so that a
/// long batch does not present one fixed client signature upstream.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Retrying HTTP fetcher backed by a shared `reqwest` client.
pub struct Fetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl Fetcher {
    /// Build a fetcher, optionally routing through an HTTP/SOCKS proxy.
    pub fn new(policy: RetryPolicy, proxy: Option<&str>) -> crate::error::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy_url) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }
        Ok(Self {
            client: builder.build()?,
            policy,
        })
    }

    /// One attempt: `Ok(Some(bytes))` on success, `Ok(None)` on 404,
    /// `Err` on anything retryable.
    async fn attempt(&self, url: &str, timeout: Duration) -> reqwest::Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, random_user_agent())
            .timeout(timeout)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = response.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }
}

#[async_trait]
impl FileFetcher for Fetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> FetchOutcome {
        let mut last_error = String::new();

        for attempt in 1..=self.policy.attempts {
            match self.attempt(url, timeout).await {
                Ok(Some(bytes)) => {
                    debug!(url = %url, bytes = bytes.len(), attempt, "Fetched file");
                    return FetchOutcome::Fetched(bytes);
                },
                Ok(None) => {
                    debug!(url = %url, "File not present upstream");
                    return FetchOutcome::NotFound;
                },
                Err(e) => {
                    last_error = e.to_string();
                    if attempt < self.policy.attempts {
                        let delay = self.policy.backoff(attempt);
                        debug!(
                            url = %url,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %last_error,
                            "Transient fetch error, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                },
            }
        }

        warn!(url = %url, error = %last_error, "Fetch failed after retries");
        FetchOutcome::Failed(last_error)
    }
}
