//! Job domain types

use serde::{Deserialize, Serialize};

/// Number of stages every report job goes through
pub const TOTAL_STEPS: u32 = 3;

/// Job execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    InProgress,
    Completed,
    Error,
}

/// Progress record of one report job
///
/// Structure shared between the server (mutates it while the pipeline runs)
/// and pollers (read it through the progress endpoint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub status: JobStatus,
    pub stage: String,
    pub current_step: u32,
    pub total_steps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deals_processed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_deals: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobProgress {
    /// Record of a job that was just created and has not started any stage
    pub fn initializing() -> Self {
        Self::in_stage(0, "Initializing...")
    }

    /// Record of a job running the given stage, with counters cleared
    pub fn in_stage(step: u32, stage: impl Into<String>) -> Self {
        Self {
            status: JobStatus::InProgress,
            stage: stage.into(),
            current_step: step,
            total_steps: TOTAL_STEPS,
            deals_processed: None,
            total_deals: None,
            error: None,
        }
    }

    /// Record of a job whose result has been stored
    pub fn completed() -> Self {
        Self {
            status: JobStatus::Completed,
            ..Self::in_stage(TOTAL_STEPS, "Complete")
        }
    }

    /// Sets both deal counters
    pub fn with_counts(mut self, processed: usize, total: usize) -> Self {
        self.set_counts(processed, total);
        self
    }

    /// Updates both deal counters in place, leaving stage and step untouched
    pub fn set_counts(&mut self, processed: usize, total: usize) {
        self.deals_processed = Some(processed);
        self.total_deals = Some(total);
    }

    /// Moves the job into the terminal error state, keeping the step it failed in
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = JobStatus::Error;
        self.stage = "Failed".to_string();
        self.error = Some(message.into());
    }

    /// Whether the job reached a terminal state
    pub fn is_finished(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Error)
    }
}
