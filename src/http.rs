//! Retrying HTTP client shared by every network-facing component.
//!
//! Wraps `reqwest` with the retry policy the publisher/registry APIs need:
//! bounded attempts with doubling backoff on transport failures and on the
//! transient status codes {429, 500, 502, 503, 504}. Only idempotent methods
//! (GET/HEAD) are exposed, and every request carries a browser user-agent to
//! reduce anti-bot blocking.

use crate::error::{DigestError, Result};
use reqwest::{Method, Response};
use std::time::Duration;
use tracing::{debug, warn};

/// Browser-identifying user-agent sent on every request
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Total per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Total attempts per request (first try + retries)
const MAX_ATTEMPTS: u32 = 3;

/// Initial backoff between attempts; doubles after each failure
const BASE_BACKOFF: Duration = Duration::from_millis(500);

/// Status codes treated as transient and retried
const RETRY_STATUS: [u16; 5] = [429, 500, 502, 503, 504];

/// HTTP client with bounded retry/backoff for idempotent requests.
pub struct HttpClient {
    client: reqwest::Client,
    max_attempts: u32,
    base_backoff: Duration,
}

impl HttpClient {
    /// Create a new client with the standard timeout and user-agent.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DigestError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_attempts: MAX_ATTEMPTS,
            base_backoff: BASE_BACKOFF,
        })
    }

    /// Issue a GET request; pass `&[]` for no query parameters.
    ///
    /// Retries transient failures; a non-retryable status (e.g. 404) is
    /// returned as `Ok` for the caller to inspect.
    pub async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Response> {
        self.request(Method::GET, url, query).await
    }

    /// Issue a HEAD request, following redirects to the final location.
    pub async fn head(&self, url: &str) -> Result<Response> {
        self.request(Method::HEAD, url, &[]).await
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Response> {
        let mut backoff = self.base_backoff;
        let mut last_err: Option<DigestError> = None;

        for attempt in 1..=self.max_attempts {
            let mut request = self.client.request(method.clone(), url);
            if !query.is_empty() {
                request = request.query(query);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if !RETRY_STATUS.contains(&status) {
                        debug!(url, status, "Request complete");
                        return Ok(response);
                    }
                    warn!(url, status, attempt, "Transient status, will retry");
                    last_err = Some(DigestError::Api {
                        code: status,
                        message: format!("{} returned {}", url, status),
                    });
                }
                // Invalid request construction cannot succeed on retry
                Err(e) if e.is_builder() => return Err(e.into()),
                Err(e) => {
                    warn!(url, attempt, error = %e, "Request failed, will retry");
                    last_err = Some(e.into());
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }

        Err(last_err.unwrap_or_else(|| DigestError::Api {
            code: 0,
            message: format!("{} failed with no recorded error", url),
        }))
    }
}
