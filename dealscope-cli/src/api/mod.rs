//! API client module
//!
//! HTTP client for communicating with the Dealscope report server.

use anyhow::{Context, Result};
use dealscope_core::domain::job::JobProgress;
use dealscope_core::dto::{ErrorBody, LoadResponse, ResultResponse};
use reqwest::Client;

/// HTTP client for the report server API
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the report server
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Request a report
    ///
    /// # Arguments
    /// * `bypass_cache` - Start a new job even when results are cached
    ///
    /// # Returns
    /// Either the cached results or the id of the started job
    pub async fn load(&self, bypass_cache: bool) -> Result<LoadResponse> {
        let mut request = self.client.get(format!("{}/api/load", self.base_url));
        if bypass_cache {
            request = request.query(&[("bypassCache", "1")]);
        }

        let response = request
            .send()
            .await
            .context("Failed to send load request")?;

        self.handle_response(response).await
    }

    /// Get the progress of a job
    ///
    /// # Arguments
    /// * `job_id` - The job identifier
    pub async fn progress(&self, job_id: &str) -> Result<JobProgress> {
        let response = self
            .client
            .get(format!("{}/api/progress", self.base_url))
            .query(&[("id", job_id)])
            .send()
            .await
            .context("Failed to send progress request")?;

        self.handle_response(response).await
    }

    /// Get the report rows of a completed job
    ///
    /// # Arguments
    /// * `job_id` - The job identifier, or `cached` for the cached report
    pub async fn result(&self, job_id: &str) -> Result<ResultResponse> {
        let response = self
            .client
            .get(format!("{}/api/result", self.base_url))
            .query(&[("id", job_id)])
            .send()
            .await
            .context("Failed to send result request")?;

        self.handle_response(response).await
    }

    /// Handle API response and deserialize JSON
    ///
    /// Error responses carry `{"error": "..."}`; its message is surfaced when
    /// present.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&error_text)
                .map(|body| body.error)
                .unwrap_or(error_text);
            anyhow::bail!("Request failed with status {}: {}", status, message);
        }

        response
            .json()
            .await
            .context("Failed to parse response JSON")
    }
}
