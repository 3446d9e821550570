//! VK API HTTP client.

use super::{CatalogClient, SearchParams, UpstreamError, AUDIO_SEARCH_METHOD};
use crate::utils::truncate_str;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Maximum characters of an error body kept in `UpstreamError::Status`.
const ERROR_BODY_LIMIT: usize = 300;

/// Client for the VK `method` endpoint
pub struct VkClient {
    http: HttpClient,
    base_url: String,
    token: String,
    timeout: Duration,
}

impl VkClient {
    /// Creates a client with a per-request timeout.
    ///
    /// The timeout bounds each catalog call so a slow API never stalls a
    /// chat handler indefinitely.
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "VK HTTP client build failed, using defaults");
                HttpClient::new()
            });
        Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
            timeout,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url.trim_end_matches('/'))
    }

    fn map_send_error(&self, e: reqwest::Error) -> UpstreamError {
        // The request URL carries the access token
        let e = e.without_url();
        if e.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl CatalogClient for VkClient {
    #[instrument(skip(self, params), fields(query = %params.query))]
    async fn audio_search(&self, params: &SearchParams) -> Result<Value, UpstreamError> {
        let count = params.count.to_string();
        let response = self
            .http
            .get(self.method_url(AUDIO_SEARCH_METHOD))
            .query(&[
                ("q", params.query.as_str()),
                ("count", count.as_str()),
                ("access_token", self.token.as_str()),
                ("v", params.version.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: truncate_str(body, ERROR_BODY_LIMIT),
            });
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| UpstreamError::Malformed(e.without_url().to_string()))?;
        debug!("VK audio.search answered");
        Ok(body)
    }
}
