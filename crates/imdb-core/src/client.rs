//! HTTP client for static IMDb documents
//!
//! This module provides a pooled HTTP client used for the pages that do not
//! need JavaScript: the title page and the season index. Fetches retry with
//! a linear backoff and report exhaustion as absence, not as an error, so
//! the pipeline can degrade instead of failing.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::Result;

/// Base URL for IMDb
pub(crate) const IMDB_BASE_URL: &str = "https://www.imdb.com";

/// Default User-Agent mimicking a modern browser
pub(crate) const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default Accept-Language header for English content
const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Default Accept header for document fetches
const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Configuration for the IMDb HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connection pool size per host (default: 4)
    pub pool_size: usize,
    /// Document request timeout in seconds (default: 15)
    pub timeout_secs: u64,
    /// Image request timeout in seconds (default: 20)
    pub image_timeout_secs: u64,
    /// Total attempts per fetch before giving up (default: 3)
    pub max_attempts: u32,
    /// Linear backoff base in milliseconds, waits `backoff_ms * attempt`
    /// between attempts (default: 1500)
    pub backoff_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            timeout_secs: 15,
            image_timeout_secs: 20,
            max_attempts: 3,
            backoff_ms: 1500,
        }
    }
}

/// Pooled HTTP client with browser-like headers and linear retry
///
/// This client automatically:
/// - Reuses keep-alive connections across fetches
/// - Retries transport and HTTP status failures up to `max_attempts`
/// - Returns `None` instead of an error when a document stays unreachable
pub struct ImdbClient {
    /// Underlying HTTP client
    client: reqwest::Client,
    /// Retry and timeout settings
    config: ClientConfig,
}

impl ImdbClient {
    /// Create a new client with default configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    ///
    /// # Arguments
    /// * `config` - Client configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::ACCEPT_LANGUAGE,
                    DEFAULT_ACCEPT_LANGUAGE.parse().unwrap(),
                );
                headers.insert(reqwest::header::ACCEPT, DEFAULT_ACCEPT.parse().unwrap());
                headers
            })
            .pool_max_idle_per_host(config.pool_size)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch an HTML document
    ///
    /// Retries on any transport or status failure with a linear backoff.
    /// A page that cannot be fetched is an expected outcome for this
    /// pipeline, so exhaustion yields `None` rather than an error.
    ///
    /// # Arguments
    /// * `url` - Absolute URL of the document
    ///
    /// # Returns
    /// The HTML content, or `None` when every attempt failed
    pub async fn fetch(&self, url: &str) -> Option<String> {
        for attempt in 1..=self.config.max_attempts {
            match self.try_fetch(url).await {
                Ok(body) => {
                    debug!("fetched {} ({} bytes)", url, body.len());
                    return Some(body);
                }
                Err(e) => {
                    warn!(
                        "fetch attempt {}/{} for {} failed: {}",
                        attempt, self.config.max_attempts, url, e
                    );
                    if attempt < self.config.max_attempts {
                        sleep(self.backoff_delay(attempt)).await;
                    }
                }
            }
        }
        warn!("giving up on {}", url);
        None
    }

    /// Fetch raw bytes, used for cover image downloads
    ///
    /// Same retry behavior as [`fetch`], with an image Accept header and
    /// the longer image timeout.
    ///
    /// [`fetch`]: ImdbClient::fetch
    pub async fn fetch_bytes(&self, url: &str) -> Option<Vec<u8>> {
        for attempt in 1..=self.config.max_attempts {
            match self.try_fetch_bytes(url).await {
                Ok(bytes) => return Some(bytes),
                Err(e) => {
                    warn!(
                        "image attempt {}/{} for {} failed: {}",
                        attempt, self.config.max_attempts, url, e
                    );
                    if attempt < self.config.max_attempts {
                        sleep(self.backoff_delay(attempt)).await;
                    }
                }
            }
        }
        None
    }

    async fn try_fetch(&self, url: &str) -> reqwest::Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        response.text().await
    }

    async fn try_fetch_bytes(&self, url: &str) -> reqwest::Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "image/*")
            .timeout(Duration::from_secs(self.config.image_timeout_secs))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Calculate the linear backoff delay after a failed attempt
    fn backoff_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.config.backoff_ms * u64::from(attempt))
    }

    /// Get the configuration (for the image stage and tests)
    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }
}
