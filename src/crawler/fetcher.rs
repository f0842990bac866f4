//! HTTP-backed rendering sessions
//!
//! This module handles:
//! - Building one HTTP client per rendering session
//! - Fetching pages directly or through an external render endpoint
//! - Mapping transport failures to `GatewayError`
//! - Bounded retry with exponential backoff

use crate::config::GatewayConfig;
use crate::crawler::gateway::{GatewayError, RenderGateway, RenderedDocument};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client for one rendering session
///
/// Each client keeps its own cookie store, so sessions never share state.
///
/// # Example
///
/// ```no_run
/// use shelf_crawler::config::GatewayConfig;
/// use shelf_crawler::crawler::build_http_client;
///
/// let config = GatewayConfig {
///     user_agent: "shelf-crawler/0.1".to_string(),
///     timeout_secs: 30,
///     max_retries: 2,
///     retry_backoff_ms: 500,
///     render_endpoint: None,
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &GatewayConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rendering session backed by an HTTP client
pub struct HttpRenderSession {
    client: Client,
    render_endpoint: Option<Url>,
}

impl HttpRenderSession {
    pub fn new(config: &GatewayConfig) -> Result<Self, crate::CrawlError> {
        let client = build_http_client(config)?;
        let render_endpoint = match &config.render_endpoint {
            Some(endpoint) => Some(
                Url::parse(endpoint).map_err(|e| crate::UrlError::Parse(e.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            client,
            render_endpoint,
        })
    }

    /// URL actually requested for `page_url`
    fn request_url(&self, page_url: &str) -> String {
        match &self.render_endpoint {
            Some(endpoint) => {
                let mut url = endpoint.clone();
                url.query_pairs_mut().append_pair("url", page_url);
                url.to_string()
            }
            None => page_url.to_string(),
        }
    }
}

#[async_trait]
impl RenderGateway for HttpRenderSession {
    async fn fetch(&mut self, url: &str) -> Result<RenderedDocument, GatewayError> {
        let response = self
            .client
            .get(self.request_url(url))
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await.map_err(|e| classify_error(url, e))?;
        Ok(RenderedDocument::new(url, html))
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        GatewayError::Unreachable {
            url: url.to_string(),
        }
    } else {
        GatewayError::Render {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// How often and how patiently a failed fetch is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Fetches `url`, retrying retryable failures up to the policy's limit
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 404 and other 4xx | Immediate failure |
/// | HTTP 429 / 5xx | Retry, backoff doubles each attempt |
/// | Timeout | Retry, backoff doubles each attempt |
/// | Connection refused | Retry, backoff doubles each attempt |
pub async fn fetch_with_retry<G: RenderGateway + ?Sized>(
    session: &mut G,
    url: &str,
    policy: RetryPolicy,
) -> Result<RenderedDocument, GatewayError> {
    let mut attempt = 0;
    loop {
        match session.fetch(url).await {
            Ok(document) => return Ok(document),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "Fetch of {} failed ({}), retry {}/{} in {:?}",
                    url,
                    e,
                    attempt,
                    policy.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
