//! Job Tracker
//!
//! Maps job identifiers to their progress records.

use dealscope_core::domain::job::JobProgress;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct TrackedJob {
    progress: JobProgress,
    updated_at: Instant,
}

/// Progress table of every job started by this process
#[derive(Debug, Default)]
pub struct JobTracker {
    jobs: RwLock<HashMap<String, TrackedJob>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new job in the initializing state
    ///
    /// Returns only once the record is visible to every reader.
    pub fn initialize_job(&self, job_id: &str) {
        self.set(job_id, JobProgress::initializing());
    }

    /// Replaces the whole progress record of a job
    pub fn set(&self, job_id: &str, progress: JobProgress) {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        jobs.insert(
            job_id.to_string(),
            TrackedJob {
                progress,
                updated_at: Instant::now(),
            },
        );
    }

    /// Current progress of a job
    pub fn get(&self, job_id: &str) -> Option<JobProgress> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        jobs.get(job_id).map(|job| job.progress.clone())
    }

    /// Mutates the current record of a job in place
    ///
    /// The closure runs under the write lock, so concurrent updates never
    /// overwrite each other. Returns `false` when the job is unknown.
    pub fn update<F>(&self, job_id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut JobProgress),
    {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        match jobs.get_mut(job_id) {
            Some(job) => {
                mutate(&mut job.progress);
                job.updated_at = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Drops finished jobs that have not changed for at least `older_than`
    ///
    /// Jobs still in progress are always kept. Returns the number removed.
    pub fn evict_finished(&self, older_than: Duration) -> usize {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let before = jobs.len();
        jobs.retain(|_, job| !(job.progress.is_finished() && job.updated_at.elapsed() >= older_than));
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealscope_core::domain::job::{JobStatus, TOTAL_STEPS};

    #[test]
    fn test_read_after_initialize() {
        let tracker = JobTracker::new();
        tracker.initialize_job("job-1");

        let progress = tracker.get("job-1").expect("job must be visible immediately");
        assert_eq!(progress.status, JobStatus::InProgress);
        assert_eq!(progress.current_step, 0);
        assert_eq!(progress.total_steps, TOTAL_STEPS);
        assert_eq!(progress.stage, "Initializing...");
    }

    #[test]
    fn test_unknown_job() {
        let tracker = JobTracker::new();
        assert!(tracker.get("nope").is_none());
        assert!(!tracker.update("nope", |p| p.set_counts(1, 1)));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_update_keeps_stage() {
        let tracker = JobTracker::new();
        tracker.set("job-1", JobProgress::in_stage(1, "Fetching lost deals"));

        assert!(tracker.update("job-1", |p| p.set_counts(100, 250)));

        let progress = tracker.get("job-1").unwrap();
        assert_eq!(progress.stage, "Fetching lost deals");
        assert_eq!(progress.current_step, 1);
        assert_eq!(progress.deals_processed, Some(100));
        assert_eq!(progress.total_deals, Some(250));
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let tracker = std::sync::Arc::new(JobTracker::new());
        tracker.set("job-1", JobProgress::in_stage(2, "Fetching custom field data").with_counts(0, 0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = std::sync::Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        tracker.update("job-1", |p| {
                            let done = p.deals_processed.unwrap_or(0) + 1;
                            p.set_counts(done, 800);
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.get("job-1").unwrap().deals_processed, Some(800));
    }

    #[test]
    fn test_evict_only_finished_jobs() {
        let tracker = JobTracker::new();
        tracker.initialize_job("running");
        tracker.set("done", JobProgress::completed());
        tracker.initialize_job("failed");
        tracker.update("failed", |p| p.fail("boom"));

        assert_eq!(tracker.evict_finished(Duration::ZERO), 2);
        assert!(tracker.get("running").is_some());
        assert!(tracker.get("done").is_none());
        assert!(tracker.get("failed").is_none());
    }

    #[test]
    fn test_recent_finished_jobs_are_kept() {
        let tracker = JobTracker::new();
        tracker.set("done", JobProgress::completed());

        assert_eq!(tracker.evict_finished(Duration::from_secs(3600)), 0);
        assert_eq!(tracker.len(), 1);
    }
}
