use std::time::Duration;

use tracing::warn;

/// Retry policy for idempotent GET requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: usize,
    /// Delay in seconds before each retry; retries stop when this runs out.
    pub delays: Vec<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delays: vec![1, 2],
        }
    }
}

impl RetryConfig {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delays: Vec::new(),
        }
    }

    fn delay_before_retry(&self, attempt: usize) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        self.delays.get(attempt).copied().map(Duration::from_secs)
    }
}

/// Send a GET, retrying on network errors and 5xx responses.
///
/// Returns immediately on success or 4xx. When retries run out the last
/// response (or error) is returned as is.
pub async fn retry_get(
    client: &reqwest::Client,
    url: &str,
    auth_token: Option<&str>,
    config: &RetryConfig,
) -> Result<reqwest::Response, reqwest::Error> {
    let max_attempts = config.max_retries + 1;
    let mut attempt = 0;

    loop {
        let mut req = client.get(url);
        if let Some(token) = auth_token {
            req = req.bearer_auth(token);
        }

        match req.send().await {
            Ok(resp) if resp.status().is_server_error() => {
                let Some(delay) = config.delay_before_retry(attempt) else {
                    return Ok(resp);
                };
                warn!(
                    "GET {} attempt {}/{} failed (HTTP {}), retrying in {}s…",
                    url,
                    attempt + 1,
                    max_attempts,
                    resp.status(),
                    delay.as_secs(),
                );
                tokio::time::sleep(delay).await;
            }
            Ok(resp) => return Ok(resp),
            Err(e) => {
                let Some(delay) = config.delay_before_retry(attempt) else {
                    return Err(e);
                };
                warn!(
                    "GET {} attempt {}/{} failed ({}), retrying in {}s…",
                    url,
                    attempt + 1,
                    max_attempts,
                    e,
                    delay.as_secs(),
                );
                tokio::time::sleep(delay).await;
            }
        }
        attempt += 1;
    }
}
