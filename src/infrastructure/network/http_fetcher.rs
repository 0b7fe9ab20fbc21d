//! HTTP ciphertext retrieval.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::domain::entities::ContentLocator;
use crate::domain::errors::FetchError;
use crate::domain::ports::ContentFetcherPort;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fetches ciphertext over HTTP(S).
///
/// Locators are absolute URLs, or paths joined onto `base_url`.
#[derive(Debug, Clone)]
pub struct HttpContentFetcher {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpContentFetcher {
    /// Creates a fetcher with the given request timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout_secs: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: None,
        })
    }

    /// Resolves relative locators against `base_url`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Returns the URL a locator resolves to.
    #[must_use]
    pub fn resolve(&self, locator: &ContentLocator) -> String {
        let raw = locator.as_str();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return raw.to_string();
        }
        match &self.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                raw.trim_start_matches('/')
            ),
            None => raw.to_string(),
        }
    }
}

#[async_trait]
impl ContentFetcherPort for HttpContentFetcher {
    async fn fetch(&self, locator: &ContentLocator) -> Result<Bytes, FetchError> {
        let url = self.resolve(locator);
        debug!(url = %url, "Downloading ciphertext");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("Request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url));
        }
        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read body: {e}")))?;

        debug!(url = %url, size = bytes.len(), "Ciphertext downloaded");
        Ok(bytes)
    }
}
