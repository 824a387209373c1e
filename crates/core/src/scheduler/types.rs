//! Types for the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A harvest run is already in progress.
    #[error("a harvest run is already in progress")]
    AlreadyRunning,
}

/// Current status of the scheduler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStatus {
    /// Whether the polling loop is running.
    pub running: bool,
    /// Whether a harvest run is executing right now.
    pub run_in_progress: bool,
    pub last_run_started: Option<DateTime<Utc>>,
    pub next_run_due: Option<DateTime<Utc>>,
    pub runs_completed: u64,
}
