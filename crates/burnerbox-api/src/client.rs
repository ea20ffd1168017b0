//! HTTP client for the disposable-mail endpoints.

use reqwest::StatusCode;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{GeneratedAddress, RawMessage};

/// Client for one disposable-mail API deployment.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given base URL (scheme + host, no trailing slash).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: normalize_base_url(base_url.into()),
        }
    }

    /// Create a client reusing an existing `reqwest::Client`.
    #[must_use]
    pub fn with_http_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: normalize_base_url(base_url.into()),
        }
    }

    /// Fetch the current snapshot of an inbox.
    ///
    /// A 404 and an empty array both mean "no messages yet" and return an
    /// empty vector. The snapshot is complete, not a delta: the server
    /// returns everything it currently holds for the address.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status other
    /// than 404, or a response body that is not a JSON message array.
    pub async fn fetch_inbox(&self, address: &str) -> Result<Vec<RawMessage>> {
        let url = format!("{}/api/emails/{address}", self.base_url);
        let response = self.http.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(address, "inbox not found on server, treating as empty");
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(Error::Status(response.status().as_u16()));
        }

        let messages: Vec<RawMessage> = response.json().await?;
        debug!(address, count = messages.len(), "fetched inbox snapshot");
        Ok(messages)
    }

    /// Mint a fresh throwaway address.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// malformed response body.
    pub async fn generate_address(&self) -> Result<String> {
        let url = format!("{}/api/generate_email", self.base_url);
        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Error::Status(response.status().as_u16()));
        }

        let generated: GeneratedAddress = response.json().await?;
        if generated.email.is_empty() {
            return Err(Error::InvalidResponse("empty email field".into()));
        }
        Ok(generated.email)
    }
}

fn normalize_base_url(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}
