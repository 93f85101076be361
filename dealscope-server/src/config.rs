//! Server configuration
//!
//! Defines the CRM connection settings, the HTTP bind address and every
//! tunable of the report pipeline.

use std::time::Duration;

use dealscope_client::{CrmClient, RateLimiter};
use thiserror::Error;

/// Environment variable holding the CRM account URL
pub const CRM_URL_VAR: &str = "ACTIVECAMPAIGN_URL";

/// Environment variable holding the CRM API key
pub const CRM_API_KEY_VAR: &str = "ACTIVECAMPAIGN_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("{0}")]
    Validation(String),
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// CRM account base URL (e.g., "https://acme.api-us1.com")
    pub crm_url: String,

    /// CRM API key sent with every upstream request
    pub crm_api_key: String,

    /// Address the HTTP API listens on
    pub bind_addr: String,

    /// How long an aggregated report stays cached
    pub cache_ttl: Duration,

    /// Maximum number of deals whose fields are fetched at the same time
    pub deal_concurrency: usize,

    /// Maximum number of concurrent upstream requests
    pub max_requests: usize,

    /// Minimum spacing between two upstream request starts
    pub request_interval: Duration,

    /// Size of the lost-deal window, in days before today
    pub lookback_days: u32,

    /// How long finished jobs stay queryable
    pub job_retention: Duration,

    /// Deals requested per listing page
    pub page_size: usize,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(crm_url: impl Into<String>, crm_api_key: impl Into<String>) -> Self {
        Self {
            crm_url: crm_url.into(),
            crm_api_key: crm_api_key.into(),
            bind_addr: "0.0.0.0:3000".to_string(),
            cache_ttl: Duration::from_secs(300), // 5 minutes
            deal_concurrency: 50,
            max_requests: CrmClient::DEFAULT_MAX_CONCURRENT,
            request_interval: CrmClient::DEFAULT_MIN_INTERVAL,
            lookback_days: 30,
            job_retention: Duration::from_secs(3600),
            page_size: 100,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - ACTIVECAMPAIGN_URL (required)
    /// - ACTIVECAMPAIGN_API_KEY (required)
    /// - DEALSCOPE_BIND_ADDR (optional, default: 0.0.0.0:3000)
    /// - DEALSCOPE_CACHE_TTL (optional, seconds, default: 300)
    /// - DEALSCOPE_DEAL_CONCURRENCY (optional, default: 50)
    /// - DEALSCOPE_MAX_REQUESTS (optional, default: 10)
    /// - DEALSCOPE_REQUEST_INTERVAL_MS (optional, milliseconds, default: 100)
    /// - DEALSCOPE_LOOKBACK_DAYS (optional, default: 30)
    /// - DEALSCOPE_JOB_RETENTION (optional, seconds, default: 3600)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let mut config = Self::new(required(CRM_URL_VAR)?, required(CRM_API_KEY_VAR)?);

        if let Some(addr) = lookup("DEALSCOPE_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "DEALSCOPE_CACHE_TTL")? {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(limit) = parse_var(&lookup, "DEALSCOPE_DEAL_CONCURRENCY")? {
            config.deal_concurrency = limit;
        }
        if let Some(limit) = parse_var(&lookup, "DEALSCOPE_MAX_REQUESTS")? {
            config.max_requests = limit;
        }
        if let Some(millis) = parse_var::<u64, _>(&lookup, "DEALSCOPE_REQUEST_INTERVAL_MS")? {
            config.request_interval = Duration::from_millis(millis);
        }
        if let Some(days) = parse_var(&lookup, "DEALSCOPE_LOOKBACK_DAYS")? {
            config.lookback_days = days;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "DEALSCOPE_JOB_RETENTION")? {
            config.job_retention = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.crm_url.starts_with("http://") && !self.crm_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "crm_url must start with http:// or https://".to_string(),
            ));
        }

        if self.bind_addr.is_empty() {
            return Err(ConfigError::Validation(
                "bind_addr cannot be empty".to_string(),
            ));
        }

        if self.deal_concurrency == 0 {
            return Err(ConfigError::Validation(
                "deal_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.max_requests == 0 {
            return Err(ConfigError::Validation(
                "max_requests must be greater than 0".to_string(),
            ));
        }

        if self.page_size == 0 {
            return Err(ConfigError::Validation(
                "page_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Upstream client throttled according to this configuration
    pub fn crm_client(&self) -> CrmClient {
        CrmClient::new(&self.crm_url, &self.crm_api_key)
            .with_limiter(RateLimiter::new(self.max_requests, self.request_interval))
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const CREDENTIALS: [(&str, &str); 2] = [
        (CRM_URL_VAR, "https://acme.api-us1.com"),
        (CRM_API_KEY_VAR, "key"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&CREDENTIALS)).unwrap();

        assert_eq!(config.crm_url, "https://acme.api-us1.com");
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.deal_concurrency, 50);
        assert_eq!(config.max_requests, 10);
        assert_eq!(config.request_interval, Duration::from_millis(100));
        assert_eq!(config.lookback_days, 30);
        assert_eq!(config.job_retention, Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_credentials() {
        let err = Config::from_lookup(lookup(&[(CRM_API_KEY_VAR, "key")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(CRM_URL_VAR)));

        let err = Config::from_lookup(lookup(&[
            (CRM_URL_VAR, "https://acme.api-us1.com"),
            (CRM_API_KEY_VAR, "  "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(CRM_API_KEY_VAR)));
    }

    #[test]
    fn test_overrides() {
        let mut vars = CREDENTIALS.to_vec();
        vars.extend([
            ("DEALSCOPE_BIND_ADDR", "127.0.0.1:4000"),
            ("DEALSCOPE_CACHE_TTL", "60"),
            ("DEALSCOPE_DEAL_CONCURRENCY", "5"),
            ("DEALSCOPE_REQUEST_INTERVAL_MS", "0"),
            ("DEALSCOPE_LOOKBACK_DAYS", "7"),
        ]);

        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:4000");
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.deal_concurrency, 5);
        assert_eq!(config.request_interval, Duration::ZERO);
        assert_eq!(config.lookback_days, 7);
    }

    #[test]
    fn test_invalid_number() {
        let mut vars = CREDENTIALS.to_vec();
        vars.push(("DEALSCOPE_MAX_REQUESTS", "ten"));

        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { name: "DEALSCOPE_MAX_REQUESTS", .. }
        ));
    }

    #[test]
    fn test_validate() {
        let config = Config::new("acme.api-us1.com", "key");
        assert!(config.validate().is_err());

        let mut config = Config::new("https://acme.api-us1.com", "key");
        config.deal_concurrency = 0;
        assert!(config.validate().is_err());
    }
}
