//! Configuration module
//!
//! Handles CLI configuration including the report server URL.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the report server
    pub server_url: String,
}
