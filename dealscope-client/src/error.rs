//! Error types for the CRM client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Errors that can occur when talking to the CRM API
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The API answered with a non-retryable error status
    #[error("CRM API error (status {status}): {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body text
        body: String,
    },

    /// The API kept answering 429/5xx until the attempt budget ran out
    #[error("CRM request failed after {attempts} attempts (last status {status})")]
    RetriesExhausted {
        /// Status code of the last attempt
        status: u16,
        /// Number of attempts made
        attempts: u32,
    },

    /// The request never produced a response
    #[error("CRM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A successful response carried a body we could not decode
    #[error("Failed to decode CRM response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Create a status error from status code and body
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// HTTP status code of the failing response, if there was one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::RetriesExhausted { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}
