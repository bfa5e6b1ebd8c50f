//! OMDb API client
//!
//! This module issues the single title lookup against the OMDb API and parses
//! the response body into a `RatingsRecord`.

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use super::RatingsRecord;
use crate::config::Config;

/// Errors that can occur when looking up a title
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed before a response body was received
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Response body was not a valid ratings payload
    #[error("Failed to parse OMDb response: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Something that can resolve a raw title to a ratings record
///
/// `OmdbClient` is the production implementation; tests substitute fakes that
/// count calls or hold responses back.
#[async_trait]
pub trait RatingsProvider: Send + Sync + 'static {
    /// Looks up `title` exactly as it appeared on the page
    async fn lookup(&self, title: &str) -> Result<RatingsRecord, FetchError>;
}

/// Client for the OMDb title endpoint
#[derive(Debug, Clone)]
pub struct OmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OmdbClient {
    /// Creates a client from the embedded configuration
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Creates a client pointing at a custom base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl RatingsProvider for OmdbClient {
    async fn lookup(&self, title: &str) -> Result<RatingsRecord, FetchError> {
        debug!(title, "requesting OMDb ratings");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("t", title), ("apikey", self.api_key.as_str())])
            .send()
            .await?;
        let text = response.text().await?;

        Ok(serde_json::from_str(&text)?)
    }
}
