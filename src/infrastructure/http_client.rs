//! HTTP client for scraping with rate limiting and error handling
//!
//! A shared reqwest client with a browser-like user agent, a bounded
//! request timeout (the de facto scrape timeout - a hung fetch never holds
//! a pool slot past it) and a global rate limiter so re-check cycles stay
//! polite towards the stores.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        let scraper = crate::infrastructure::config::ScraperConfig::default();
        Self {
            user_agent: scraper.user_agent,
            timeout_seconds: scraper.timeout_seconds,
            max_requests_per_second: scraper.max_requests_per_second,
        }
    }
}

/// Rate-limited HTTP client shared by every scraper capability.
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Fetches a URL and returns its body text.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        self.rate_limiter.until_ready().await;

        tracing::debug!("Fetching URL: {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch URL: {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP request failed with status {}: {url}", response.status());
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from: {url}"))
    }
}
