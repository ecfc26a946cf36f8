//! HTTP client wrapper with rate limiting

use crate::error::{Error, Result};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Rate limiter shared by every request made through one client
pub type RegistryRateLimiter = Arc<
    RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
>;

/// HTTP client wrapper for registry requests with optional rate limiting
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    rate_limiter: Option<RegistryRateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client without rate limiting
    pub fn new() -> Result<Self> {
        Self::build(DEFAULT_TIMEOUT, None)
    }

    /// Create a new HTTP client with rate limiting
    ///
    /// # Arguments
    ///
    /// * `requests_per_second` - Maximum requests per second
    /// * `timeout` - Per-request timeout
    pub fn with_rate_limit(requests_per_second: u32, timeout: Duration) -> Result<Self> {
        let rps = NonZeroU32::new(requests_per_second).ok_or_else(|| {
            Error::other("requests_per_second must be greater than zero")
        })?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));
        Self::build(timeout, Some(rate_limiter))
    }

    fn build(timeout: Duration, rate_limiter: Option<RegistryRateLimiter>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("unblock/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Wait for rate limiter if enabled
    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }
    }

    async fn send(
        &self,
        url: &str,
        headers: reqwest::header::HeaderMap,
    ) -> Result<reqwest::Response> {
        self.wait_for_rate_limit().await;

        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(url.to_string())
                } else {
                    Error::Http(e)
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimitExceeded(url.to_string()));
        }
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response)
    }

    /// Make a GET request with custom headers and deserialize JSON response
    pub async fn get_json_with_headers<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        headers: reqwest::header::HeaderMap,
    ) -> Result<T> {
        let response = self.send(url, headers).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Make a GET request and return the response text
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.send(url, reqwest::header::HeaderMap::new()).await?;
        Ok(response.text().await?)
    }
}
