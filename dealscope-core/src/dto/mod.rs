//! Data Transfer Objects
//!
//! Bodies exchanged between the dealscope server and its clients.

use serde::{Deserialize, Serialize};

use crate::domain::report::AggregatedResult;

/// Job identifier returned when a load is served from the result cache
pub const CACHED_JOB_ID: &str = "cached";

/// Response to a load request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    pub job_id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<AggregatedResult>>,
}

impl LoadResponse {
    /// A freshly started job
    pub fn started(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            cached: false,
            results: None,
        }
    }

    /// Results served from the cache without starting a job
    pub fn cached(results: Vec<AggregatedResult>) -> Self {
        Self {
            job_id: CACHED_JOB_ID.to_string(),
            cached: true,
            results: Some(results),
        }
    }
}

/// Response to a result request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultResponse {
    pub results: Vec<AggregatedResult>,
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
