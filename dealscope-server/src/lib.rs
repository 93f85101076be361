//! Dealscope Server
//!
//! Builds the lost-deals report from the CRM and serves it over HTTP.
//! Reports are produced by background jobs whose progress can be polled.

pub mod api;
pub mod config;
pub mod repository;
pub mod service;
pub mod store;

use std::sync::Arc;

use config::Config;
use repository::{CrmRepository, HttpCrmRepository};
use service::{CustomFieldFetcher, DealFetcher, PipelineService, ReportCache};
use store::{FieldOptionCache, JobTracker};

/// Wires the pipeline service and its stores from the configuration
pub fn build_service(config: &Config) -> PipelineService {
    let crm: Arc<dyn CrmRepository> = Arc::new(HttpCrmRepository::new(config.crm_client()));

    let deals = DealFetcher::new(Arc::clone(&crm))
        .with_page_size(config.page_size)
        .with_lookback_days(config.lookback_days);
    let fields = CustomFieldFetcher::new(crm, Arc::new(FieldOptionCache::new()))
        .with_concurrency(config.deal_concurrency);

    PipelineService::new(
        deals,
        fields,
        Arc::new(JobTracker::new()),
        Arc::new(ReportCache::new(config.cache_ttl)),
    )
}
