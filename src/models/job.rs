use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::geo::Coordinates;

/// Status of a poster generation job in the async queue.
///
/// Transitions are monotonic along pending -> processing -> completed/failed.
/// `Expired` is an overlay applied at read time to non-terminal jobs older
/// than the TTL; it never replaces a terminal status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Expired,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Parameters captured at submission and handed unchanged to the pipeline.
///
/// `coords` is optional at this level: when absent the worker resolves the
/// city/country pair through the geocoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosterParams {
    pub coords: Option<Coordinates>,
    pub theme: String,
    pub distance: u32,
    pub city: String,
    pub country: String,
}

/// A poster generation job tracked by the job store.
#[derive(Debug, Clone)]
pub struct PosterJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub progress: u8,
    pub url: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub params: PosterParams,
}

/// Read-only projection of a job returned to status pollers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusView {
    pub status: JobStatus,
    pub progress: u8,
    pub url: Option<String>,
    pub error: Option<String>,
}

impl From<&PosterJob> for JobStatusView {
    fn from(job: &PosterJob) -> Self {
        Self {
            status: job.status,
            progress: job.progress,
            url: job.url.clone(),
            error: job.error.clone(),
        }
    }
}
