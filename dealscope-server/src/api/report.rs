//! Report API Handlers
//!
//! HTTP endpoints for starting report jobs and reading their progress and
//! results.

use axum::{
    Json,
    extract::{Query, State},
};
use dealscope_core::domain::job::JobProgress;
use dealscope_core::dto::{CACHED_JOB_ID, LoadResponse, ResultResponse};
use serde::Deserialize;

use crate::api::error::{ApiError, ApiResult};
use crate::service::{LoadOutcome, PipelineService};

// =============================================================================
// Query Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct LoadQuery {
    #[serde(rename = "bypassCache")]
    pub bypass_cache: Option<String>,
}

impl LoadQuery {
    fn bypass_cache(&self) -> bool {
        matches!(self.bypass_cache.as_deref(), Some("1") | Some("true"))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct JobQuery {
    pub id: Option<String>,
}

impl JobQuery {
    fn require_id(&self) -> ApiResult<&str> {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing job ID".to_string()))
    }
}

// =============================================================================
// Endpoints
// =============================================================================

/// GET /api/load
/// Serve cached results or start a new report job
///
/// Query parameters:
/// - `bypassCache` (optional): `1` always starts a new job
pub async fn load(
    State(service): State<PipelineService>,
    Query(params): Query<LoadQuery>,
) -> Json<LoadResponse> {
    let response = match service.load(params.bypass_cache()) {
        LoadOutcome::Cached(results) => LoadResponse::cached(results),
        LoadOutcome::Started(job_id) => LoadResponse::started(job_id),
    };

    Json(response)
}

/// GET /api/progress?id={job_id}
/// Get the progress record of a job
pub async fn progress(
    State(service): State<PipelineService>,
    Query(params): Query<JobQuery>,
) -> ApiResult<Json<JobProgress>> {
    let job_id = params.require_id()?;
    tracing::debug!("Getting progress of job: {}", job_id);

    Ok(Json(service.progress(job_id)?))
}

/// GET /api/result?id={job_id}
/// Get the report rows of a completed job
///
/// The `cached` id reads the result cache directly.
pub async fn result(
    State(service): State<PipelineService>,
    Query(params): Query<JobQuery>,
) -> ApiResult<Json<ResultResponse>> {
    let job_id = params.require_id()?;
    tracing::debug!("Getting results of job: {}", job_id);

    let results = if job_id == CACHED_JOB_ID {
        service
            .cached_results()
            .ok_or_else(|| ApiError::NotFound("Results not found".to_string()))?
    } else {
        service.results(job_id)?
    };

    Ok(Json(ResultResponse { results }))
}
