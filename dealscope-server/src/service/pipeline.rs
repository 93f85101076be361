//! Report pipeline
//!
//! Runs the three stages of a lost-deals report in a background task and
//! records every step in the [`JobTracker`]:
//! 1. Fetch the lost deals of the lookback window
//! 2. Fetch the country and program of each deal
//! 3. Aggregate, cache the rows and mark the job completed

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dealscope_client::UpstreamError;
use dealscope_core::aggregate_results;
use dealscope_core::domain::job::{JobProgress, JobStatus};
use dealscope_core::domain::report::AggregatedResult;
use thiserror::Error;
use tokio::time;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::service::custom_fields::CustomFieldFetcher;
use crate::service::deals::DealFetcher;
use crate::store::{JobTracker, ResultCache};

/// Cache key of the latest aggregated report
pub const RESULTS_CACHE_KEY: &str = "lost-deals-results";

/// Aggregated rows as cached between runs
pub type ReportCache = ResultCache<Vec<AggregatedResult>>;

/// Terminal failure of a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to fetch lost deals: {0}")]
    FetchDeals(#[source] UpstreamError),

    #[error("Pipeline task panicked: {0}")]
    Panicked(String),

    #[error("Pipeline task was cancelled")]
    Cancelled,
}

/// Errors returned when querying a job
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job {0} not found")]
    NotFound(String),

    #[error("Job {0} not completed yet")]
    NotCompleted(String),

    #[error("Results not found")]
    ResultsUnavailable,
}

/// Answer to a load request
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Fresh results were already cached; no job was started
    Cached(Vec<AggregatedResult>),
    /// A job was started under this id
    Started(String),
}

#[derive(Clone)]
pub struct PipelineService {
    deals: DealFetcher,
    fields: CustomFieldFetcher,
    jobs: Arc<JobTracker>,
    cache: Arc<ReportCache>,
}

impl PipelineService {
    pub fn new(
        deals: DealFetcher,
        fields: CustomFieldFetcher,
        jobs: Arc<JobTracker>,
        cache: Arc<ReportCache>,
    ) -> Self {
        Self {
            deals,
            fields,
            jobs,
            cache,
        }
    }

    pub fn jobs(&self) -> &Arc<JobTracker> {
        &self.jobs
    }

    /// Serves cached results, or starts a new job when there are none
    ///
    /// `bypass_cache` always starts a new job.
    pub fn load(&self, bypass_cache: bool) -> LoadOutcome {
        if !bypass_cache {
            if let Some(results) = self.cached_results() {
                debug!("Serving {} cached report rows", results.len());
                return LoadOutcome::Cached(results);
            }
        }

        LoadOutcome::Started(self.start_job())
    }

    /// Registers a new job and runs the pipeline for it in the background
    ///
    /// The job is visible in the tracker before its id is returned.
    pub fn start_job(&self) -> String {
        let job_id = new_job_id();
        self.jobs.initialize_job(&job_id);
        info!("Starting report job {}", job_id);

        let service = self.clone();
        let id = job_id.clone();
        tokio::spawn(async move { service.supervise(id).await });

        job_id
    }

    /// Runs the pipeline in its own task and records any failure on the job
    async fn supervise(self, job_id: String) {
        let runner = self.clone();
        let id = job_id.clone();
        let handle = tokio::spawn(async move { runner.run(&id).await });

        let outcome = match handle.await {
            Ok(outcome) => outcome.map(|_| ()),
            Err(err) if err.is_panic() => Err(PipelineError::Panicked(panic_message(
                err.into_panic(),
            ))),
            Err(_) => Err(PipelineError::Cancelled),
        };

        if let Err(err) = outcome {
            error!("Report job {} failed: {}", job_id, err);
            self.jobs.update(&job_id, |progress| progress.fail(err.to_string()));
        }
    }

    /// Runs every stage for `job_id` and caches the aggregated rows
    ///
    /// The job is only marked completed once the rows are cached. On error
    /// nothing is cached and the job record is left for the caller to fail.
    pub async fn run(&self, job_id: &str) -> Result<Vec<AggregatedResult>, PipelineError> {
        self.jobs.set(
            job_id,
            JobProgress::in_stage(
                1,
                format!(
                    "Fetching lost deals from last {} days",
                    self.deals.lookback_days()
                ),
            ),
        );

        let deals = self
            .deals
            .fetch_lost_deals(|fetched, total| self.report_counts(job_id, fetched, total))
            .await
            .map_err(PipelineError::FetchDeals)?;
        info!("Job {}: fetched {} lost deals", job_id, deals.len());

        self.jobs.set(
            job_id,
            JobProgress::in_stage(2, "Fetching custom field data").with_counts(0, deals.len()),
        );

        let deal_ids: Vec<String> = deals.into_iter().map(|deal| deal.id).collect();
        let fields = self
            .fields
            .fetch_custom_fields_for_deals(&deal_ids, |done, total| {
                self.report_counts(job_id, done, total)
            })
            .await;
        info!(
            "Job {}: resolved custom fields for {} of {} deals",
            job_id,
            fields.len(),
            deal_ids.len()
        );

        self.jobs
            .set(job_id, JobProgress::in_stage(3, "Aggregating results"));

        let results = aggregate_results(&fields);
        self.cache.set(RESULTS_CACHE_KEY, results.clone());
        self.jobs.set(job_id, JobProgress::completed());

        info!("Job {} completed with {} report rows", job_id, results.len());
        Ok(results)
    }

    /// Current progress of a job
    pub fn progress(&self, job_id: &str) -> Result<JobProgress, JobError> {
        self.jobs
            .get(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// Results of a completed job
    ///
    /// Every job shares the one cached report, so results of an old job
    /// disappear once the cache entry expires.
    pub fn results(&self, job_id: &str) -> Result<Vec<AggregatedResult>, JobError> {
        let progress = self.progress(job_id)?;
        if progress.status != JobStatus::Completed {
            return Err(JobError::NotCompleted(job_id.to_string()));
        }

        self.cached_results().ok_or(JobError::ResultsUnavailable)
    }

    /// Cached report rows, if still fresh
    pub fn cached_results(&self) -> Option<Vec<AggregatedResult>> {
        self.cache.get(RESULTS_CACHE_KEY)
    }

    /// Periodically evicts finished jobs older than `retention`
    pub fn start_eviction_loop(&self, retention: Duration) -> tokio::task::JoinHandle<()> {
        let jobs = Arc::clone(&self.jobs);
        let period = retention.clamp(Duration::from_secs(1), Duration::from_secs(60));

        tokio::spawn(async move {
            let mut ticker = time::interval(period);

            loop {
                ticker.tick().await;

                let evicted = jobs.evict_finished(retention);
                if evicted > 0 {
                    debug!("Evicted {} finished jobs ({} remaining)", evicted, jobs.len());
                }
            }
        })
    }

    fn report_counts(&self, job_id: &str, processed: usize, total: usize) {
        self.jobs
            .update(job_id, |progress| progress.set_counts(processed, total));
    }
}

/// Job identifier of the form `job-<millis>-<random>`
fn new_job_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("job-{}-{}", Utc::now().timestamp_millis(), &suffix[..9])
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::CrmRepository;
    use crate::service::fake::FakeCrm;
    use crate::store::FieldOptionCache;
    use dealscope_core::domain::job::TOTAL_STEPS;

    fn service(crm: FakeCrm) -> PipelineService {
        let crm: Arc<dyn CrmRepository> = Arc::new(crm);
        PipelineService::new(
            DealFetcher::new(Arc::clone(&crm)),
            CustomFieldFetcher::new(crm, Arc::new(FieldOptionCache::new())),
            Arc::new(JobTracker::new()),
            Arc::new(ReportCache::default()),
        )
    }

    async fn wait_until_finished(service: &PipelineService, job_id: &str) -> JobProgress {
        for _ in 0..200 {
            let progress = service.progress(job_id).unwrap();
            if progress.is_finished() {
                return progress;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} did not finish", job_id);
    }

    #[test]
    fn test_job_id_format() {
        let id = new_job_id();
        let parts: Vec<&str> = id.splitn(3, '-').collect();

        assert_eq!(parts[0], "job");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert_ne!(new_job_id(), id);
    }

    #[tokio::test]
    async fn test_end_to_end_report() {
        let service = service(FakeCrm::three_deals());

        let job_id = match service.load(false) {
            LoadOutcome::Started(id) => id,
            other => panic!("unexpected outcome: {other:?}"),
        };
        let progress = wait_until_finished(&service, &job_id).await;

        assert_eq!(progress.status, JobStatus::Completed);
        assert_eq!(progress.current_step, TOTAL_STEPS);
        assert_eq!(progress.total_steps, TOTAL_STEPS);
        assert_eq!(progress.stage, "Complete");

        let expected = vec![
            AggregatedResult::new("Portugal", "Golden Visa", 2),
            AggregatedResult::new("Spain", "Residency", 1),
        ];
        assert_eq!(service.results(&job_id).unwrap(), expected);
        assert_eq!(service.load(false), LoadOutcome::Cached(expected));
    }

    #[tokio::test]
    async fn test_bypass_starts_new_job() {
        let service = service(FakeCrm::three_deals());
        service.run("warmup").await.unwrap();

        match service.load(true) {
            LoadOutcome::Started(id) => assert!(id.starts_with("job-")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_job_visible_immediately() {
        let service = service(FakeCrm::three_deals());

        let job_id = service.start_job();

        assert!(service.progress(&job_id).is_ok());
    }

    #[tokio::test]
    async fn test_failing_deal_fetch_marks_error() {
        let service = service(FakeCrm {
            fail_listing: true,
            ..Default::default()
        });

        let job_id = service.start_job();
        let progress = wait_until_finished(&service, &job_id).await;

        assert_eq!(progress.status, JobStatus::Error);
        assert_eq!(progress.current_step, 1);
        assert!(progress.error.unwrap().contains("Failed to fetch lost deals"));
        assert!(service.cached_results().is_none());
        assert!(matches!(
            service.results(&job_id),
            Err(JobError::NotCompleted(_))
        ));
    }

    #[tokio::test]
    async fn test_panic_marks_error() {
        let service = service(FakeCrm {
            panic_on_listing: true,
            ..Default::default()
        });

        let job_id = service.start_job();
        let progress = wait_until_finished(&service, &job_id).await;

        assert_eq!(progress.status, JobStatus::Error);
        assert!(progress.error.unwrap().contains("listing exploded"));
        assert!(service.cached_results().is_none());
    }

    #[tokio::test]
    async fn test_failed_deal_left_out_of_report() {
        let mut crm = FakeCrm::three_deals();
        crm.failing_deals.insert("3".to_string());
        let service = service(crm);
        service.jobs().initialize_job("job-x");

        let results = service.run("job-x").await.unwrap();

        assert_eq!(results, vec![AggregatedResult::new("Portugal", "Golden Visa", 2)]);
        assert_eq!(
            service.progress("job-x").unwrap(),
            JobProgress::completed()
        );
    }

    #[tokio::test]
    async fn test_no_deals_completes_with_empty_report() {
        let service = service(FakeCrm::default().with_options());

        let results = service.run("job-empty").await.unwrap();

        assert!(results.is_empty());
        assert_eq!(service.cached_results(), Some(Vec::new()));
    }

    #[test]
    fn test_unknown_job() {
        let service = service(FakeCrm::default());

        assert!(matches!(service.progress("nope"), Err(JobError::NotFound(_))));
        assert!(matches!(service.results("nope"), Err(JobError::NotFound(_))));
    }

    #[test]
    fn test_completed_job_with_expired_cache() {
        let service = service(FakeCrm::default());
        service.jobs().set("job-old", JobProgress::completed());

        assert!(matches!(
            service.results("job-old"),
            Err(JobError::ResultsUnavailable)
        ));
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new("owned".to_string())), "owned");
        assert_eq!(panic_message(Box::new(3u8)), "unknown panic");
    }
}
