//! API Module
//!
//! HTTP API layer of the server.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod report;

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::PipelineService;

/// Create the main API router with all endpoints
pub fn create_router(service: PipelineService) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Report endpoints
        .route("/api/load", get(report::load))
        .route("/api/progress", get(report::progress))
        .route("/api/result", get(report::result))
        // Add state and middleware
        .with_state(service)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
