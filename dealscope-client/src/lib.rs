//! Dealscope CRM Client
//!
//! A throttled, retrying HTTP client for the CRM (ActiveCampaign v3) API.
//!
//! Every HTTP attempt goes through a shared [`RateLimiter`] and failed attempts
//! are retried according to a [`BackoffPolicy`]:
//! - 429 and 5xx responses are retried with exponential backoff plus jitter
//! - transport failures, including a body cut off mid-download, are retried
//!   on the same schedule without jitter
//! - any other non-2xx response fails immediately
//!
//! # Example
//!
//! ```no_run
//! use dealscope_client::CrmClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), dealscope_client::UpstreamError> {
//!     let client = CrmClient::new("https://example.api-us1.com", "api-key");
//!     let meta = client.custom_field_meta(60).await?;
//!     println!("{} options", meta.option_labels().len());
//!     Ok(())
//! }
//! ```

pub mod backoff;
mod custom_fields;
mod deals;
pub mod error;
pub mod limiter;

// Re-export commonly used types
pub use backoff::BackoffPolicy;
pub use custom_fields::{CustomFieldData, CustomFieldMeta, CustomFieldMetaResponse, FieldValue};
pub use deals::{DealsMeta, DealsPage, LOST_STATUS};
pub use error::{Result, UpstreamError};
pub use limiter::RateLimiter;

use reqwest::header::ACCEPT;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Header carrying the CRM API key
pub const API_TOKEN_HEADER: &str = "Api-Token";

/// HTTP client for the CRM API
#[derive(Debug, Clone)]
pub struct CrmClient {
    /// Base URL of the CRM account (e.g., "https://acme.api-us1.com")
    base_url: String,
    /// API key sent with every request
    api_key: String,
    /// HTTP client instance
    client: Client,
    /// Throttle applied to every HTTP attempt
    limiter: RateLimiter,
    /// Retry schedule for throttled or failed attempts
    backoff: BackoffPolicy,
}

impl CrmClient {
    /// Default cap on concurrent upstream requests
    pub const DEFAULT_MAX_CONCURRENT: usize = 10;

    /// Default spacing between request starts (10 requests per second)
    pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

    /// Create a new CRM client with the default throttle and retry policy
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the CRM account
    /// * `api_key` - The API key sent in the `Api-Token` header
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(base_url, api_key, Client::new())
    }

    /// Create a new CRM client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
            limiter: RateLimiter::new(Self::DEFAULT_MAX_CONCURRENT, Self::DEFAULT_MIN_INTERVAL),
            backoff: BackoffPolicy::default(),
        }
    }

    /// Replace the request throttle
    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Replace the retry policy
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Get the base URL of the CRM account
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Issue a GET request and decode the JSON response
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.request(Method::GET, endpoint, None::<&()>).await
    }

    /// Issue a POST request with a JSON body and decode the JSON response
    ///
    /// The body is serialized again for every attempt.
    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, endpoint, Some(body)).await
    }

    // =============================================================================
    // Request Loop
    // =============================================================================

    async fn request<B, T>(&self, method: Method, endpoint: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut builder = self
                .client
                .request(method.clone(), &url)
                .header(API_TOKEN_HEADER, &self.api_key)
                .header(ACCEPT, "application/json");
            if let Some(body) = body {
                // Also sets `Content-Type: application/json`.
                builder = builder.json(body);
            }

            debug!("{} {} (attempt {})", method, endpoint, attempt);

            // The permit covers the whole exchange, body download included.
            let exchange = self
                .limiter
                .execute(async {
                    let response = builder.send().await?;
                    let status = response.status();
                    let bytes = response.bytes().await?;
                    Ok::<_, reqwest::Error>((status, bytes))
                })
                .await;

            match exchange {
                Ok((status, _)) if BackoffPolicy::is_retryable_status(status) => {
                    let status = status.as_u16();
                    if !self.backoff.can_retry(attempt) {
                        return Err(UpstreamError::RetriesExhausted {
                            status,
                            attempts: attempt,
                        });
                    }

                    let delay = self.backoff.delay_with_jitter(attempt);
                    warn!(
                        "{} {} returned {} (attempt {}/{}), retrying in {:?}",
                        method, endpoint, status, attempt, self.backoff.max_attempts, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok((status, bytes)) => return Self::handle_response(status, &bytes),
                Err(err) => {
                    if !self.backoff.can_retry(attempt) {
                        return Err(UpstreamError::Transport(err));
                    }

                    let delay = self.backoff.delay(attempt);
                    warn!(
                        "{} {} failed (attempt {}/{}): {}, retrying in {:?}",
                        method, endpoint, attempt, self.backoff.max_attempts, err, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and decode the JSON body of a fully read response
    fn handle_response<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
        if !status.is_success() {
            let error_text = String::from_utf8_lossy(body).into_owned();
            return Err(UpstreamError::status(status.as_u16(), error_text));
        }

        serde_json::from_slice(body).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = CrmClient::new("https://acme.api-us1.com", "key");
        assert_eq!(client.base_url(), "https://acme.api-us1.com");
        assert_eq!(client.backoff(), &BackoffPolicy::default());
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = CrmClient::new("https://acme.api-us1.com/", "key");
        assert_eq!(client.base_url(), "https://acme.api-us1.com");
    }

    #[test]
    fn test_client_with_custom_policy() {
        let policy = BackoffPolicy::new(5, Duration::from_millis(10), Duration::ZERO);
        let client = CrmClient::with_client("http://localhost:9000", "key", Client::new())
            .with_backoff(policy.clone())
            .with_limiter(RateLimiter::concurrency(4));
        assert_eq!(client.backoff(), &policy);
    }
}
