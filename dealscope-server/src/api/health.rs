//! Liveness endpoint
//!
//! Answers without touching the CRM or the job table, so a stalled pipeline
//! never makes the server look down.

use axum::http::StatusCode;

/// GET /health
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
