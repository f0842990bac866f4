//! Render gateway boundary
//!
//! A rendering session loads one URL at a time and hands back the fully
//! rendered markup. How it renders (plain HTTP, a headless browser service,
//! a fixture map in tests) is up to the implementation.

use async_trait::async_trait;
use scraper::Html;
use thiserror::Error;

/// Errors a rendering session can report for a single fetch
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Could not connect to {url}")]
    Unreachable { url: String },

    #[error("Failed to render {url}: {message}")]
    Render { url: String, message: String },

    #[error("Rendering session pool is closed")]
    PoolClosed,
}

impl GatewayError {
    /// True for failures that may go away on a later attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout { .. } | Self::Unreachable { .. } => true,
            Self::Render { .. } | Self::PoolClosed => false,
        }
    }
}

/// Rendered page content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// URL the content was loaded from
    pub url: String,
    pub html: String,
}

impl RenderedDocument {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    /// Parses the markup into a queryable DOM
    ///
    /// `Html` is not `Send`; parse after the fetch has completed and drop it
    /// before the next await.
    pub fn parse(&self) -> Html {
        Html::parse_document(&self.html)
    }
}

/// One stateful rendering session
#[async_trait]
pub trait RenderGateway: Send + 'static {
    /// Loads `url` and returns its rendered content
    async fn fetch(&mut self, url: &str) -> Result<RenderedDocument, GatewayError>;
}
