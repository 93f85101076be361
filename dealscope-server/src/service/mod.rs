//! Service Module
//!
//! Business logic layer of the server.
//! Services orchestrate between the CRM repository and the in-memory stores.

pub mod custom_fields;
pub mod deals;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod fake;

// Re-export for convenience
pub use custom_fields::CustomFieldFetcher;
pub use deals::DealFetcher;
pub use pipeline::{JobError, LoadOutcome, PipelineError, PipelineService, ReportCache};
