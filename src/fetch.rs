use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use thiserror::Error;
use tracing::{error, warn};

const USER_AGENT: &str = "Mozilla/5.0";
const TIMEOUT: Duration = Duration::from_secs(10);

/// One GET attempt, no retries.
pub trait PageSource {
    fn get(&self, url: &str) -> impl Future<Output = Result<String>>;
}

/// reqwest-backed source with the fixed user agent and socket timeout.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

impl PageSource for HttpSource {
    async fn get(&self, url: &str) -> Result<String> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

#[derive(Debug, Error)]
#[error("failed to fetch {url} after {attempts} attempts: {source}")]
pub struct FetchError {
    pub url: String,
    pub attempts: u32,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// `backoff_base * 2^(attempt-1)` plus up to one second of jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.backoff_base * 2u32.pow(attempt.saturating_sub(1));
        let jitter = rand::rng().random_range(0.0..1.0);
        exp + Duration::from_secs_f64(jitter)
    }
}

/// Fetch `url`, retrying transient failures with exponential backoff.
pub async fn fetch<S: PageSource>(
    source: &S,
    url: &str,
    policy: &RetryPolicy,
) -> Result<String, FetchError> {
    let retries = policy.retries.max(1);
    let mut attempt = 1;

    loop {
        match source.get(url).await {
            Ok(body) => return Ok(body),
            Err(e) if attempt < retries => {
                let backoff = policy.backoff(attempt);
                warn!(
                    "Attempt {}/{} failed for {}: {:#}, backing off {:.1}s",
                    attempt,
                    retries,
                    url,
                    e,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => {
                error!("Failed to fetch {} after {} attempts: {:#}", url, attempt, e);
                return Err(FetchError {
                    url: url.to_string(),
                    attempts: attempt,
                    source: e.into(),
                });
            }
        }
    }
}

// ── Tests ──
