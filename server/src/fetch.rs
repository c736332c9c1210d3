//! Model card (README) fetching with rate-limit backoff
//!
//! Used when refreshing snapshot records. Fetch failures never propagate;
//! callers get an empty string instead.

use std::time::Duration;

const README_URL: &str = "https://huggingface.co";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry schedule for rate-limited requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            backoff_base: 2,
        }
    }
}

impl RetryPolicy {
    /// Sleep before retrying after the given zero-based attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.backoff_base.saturating_pow(attempt))
    }
}

/// Outcome of a single request attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResponse {
    Ok(String),
    RateLimited,
    Failed,
}

/// Run `attempt` until it succeeds, fails, or retries run out
pub fn fetch_with_backoff<A, S>(policy: &RetryPolicy, mut attempt: A, mut sleep: S) -> String
where
    A: FnMut() -> FetchResponse,
    S: FnMut(Duration),
{
    for n in 0..policy.max_retries {
        match attempt() {
            FetchResponse::Ok(body) => return body,
            FetchResponse::Failed => return String::new(),
            FetchResponse::RateLimited => {
                let wait = policy.delay(n);
                tracing::warn!("Rate limited, retrying in {}s", wait.as_secs());
                sleep(wait);
            }
        }
    }
    tracing::warn!("Giving up after {} rate-limited attempts", policy.max_retries);
    String::new()
}

/// Fetches raw model cards from the hub
pub struct ReadmeFetcher {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
    policy: RetryPolicy,
}

impl ReadmeFetcher {
    pub fn new(token: Option<String>, policy: RetryPolicy) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
            base_url: README_URL.to_string(),
            token,
            policy,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn readme_url(&self, model_id: &str) -> String {
        format!(
            "{}/{}/raw/main/README.md",
            self.base_url.trim_end_matches('/'),
            model_id
        )
    }

    /// README text for `model_id`, or an empty string
    pub fn fetch(&self, model_id: &str) -> String {
        let url = self.readme_url(model_id);
        fetch_with_backoff(&self.policy, || self.attempt(&url), std::thread::sleep)
    }

    fn attempt(&self, url: &str) -> FetchResponse {
        let mut request = self.agent.get(url);
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        match request.call() {
            Ok(response) => match response.into_string() {
                Ok(body) => FetchResponse::Ok(body),
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", url, e);
                    FetchResponse::Failed
                }
            },
            Err(ureq::Error::Status(429, _)) => FetchResponse::RateLimited,
            Err(ureq::Error::Status(code, _)) => {
                tracing::debug!("{} returned {}", url, code);
                FetchResponse::Failed
            }
            Err(e) => {
                tracing::warn!("Request to {} failed: {}", url, e);
                FetchResponse::Failed
            }
        }
    }
}
