use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::models::job::{JobStatus, JobStatusView, PosterJob, PosterParams};

/// Non-terminal jobs older than this poll as expired (30 minutes).
pub const JOB_TTL_SECONDS: i64 = 30 * 60;

/// Progress reported the moment a worker claims a job.
pub const PROGRESS_CLAIMED: u8 = 10;

/// A job as it travels through the dispatch queue.
#[derive(Debug)]
pub struct QueuedJob {
    pub job_id: Uuid,
    pub params: PosterParams,
}

/// Owns every job record; created at startup and handed around by `Arc`.
///
/// Records are mutated only by the submission path (create), the single
/// worker executing a given job (status/progress/result/error), and the
/// sweeper (delete), so no per-record locking is needed beyond the map lock.
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, PosterJob>>,
    queue: mpsc::UnboundedSender<QueuedJob>,
}

impl JobStore {
    /// Create the store and the receiving end of its dispatch queue.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<QueuedJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { jobs: RwLock::new(HashMap::new()), queue: tx }, rx)
    }

    /// Create a pending job and enqueue it for dispatch. Never fails:
    /// downstream problems surface later through the status poll.
    pub async fn submit(&self, params: PosterParams) -> Uuid {
        let id = Uuid::new_v4();
        let job = PosterJob {
            id,
            status: JobStatus::Pending,
            progress: 0,
            url: None,
            error: None,
            created_at: Utc::now(),
            params: params.clone(),
        };

        self.jobs.write().await.insert(id, job);

        if self.queue.send(QueuedJob { job_id: id, params }).is_err() {
            // Dispatcher is gone (shutdown); the record stays pending until it
            // expires. The job never reaches the queue, so the depth gauge
            // stays untouched.
            tracing::warn!(job_id = %id, "Job queue closed, job will not be processed");
        } else {
            metrics::gauge!("poster_queue_depth").increment(1.0);
        }

        metrics::counter!("poster_jobs_total").increment(1);
        tracing::info!(job_id = %id, "Job submitted");

        id
    }

    /// Status projection for pollers, or `None` for unknown ids.
    ///
    /// Applies the expiry overlay: a non-terminal job older than the TTL is
    /// stored and reported as expired. Terminal jobs never expire.
    pub async fn get_status(&self, job_id: Uuid) -> Option<JobStatusView> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id)?;

        let age = Utc::now().signed_duration_since(job.created_at).num_seconds();
        if age > JOB_TTL_SECONDS && !job.status.is_terminal() {
            job.status = JobStatus::Expired;
        }

        Some(JobStatusView::from(&*job))
    }

    /// Remove records older than twice the TTL, terminal or not.
    /// Returns the number removed. Run periodically, never from `get_status`.
    pub async fn sweep_expired(&self) -> usize {
        let cutoff = Utc::now() - chrono::Duration::seconds(2 * JOB_TTL_SECONDS);
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| job.created_at > cutoff);
        let removed = before - jobs.len();

        if removed > 0 {
            tracing::info!(count = removed, "Swept expired jobs");
        }
        removed
    }

    /// Mark a job claimed by a worker.
    pub async fn set_processing(&self, job_id: Uuid) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            if job.status == JobStatus::Pending {
                job.status = JobStatus::Processing;
                job.progress = PROGRESS_CLAIMED;
            }
        }
    }

    /// Record a successful render. No-op on terminal records.
    pub async fn complete(&self, job_id: Uuid, url: String) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            if !job.status.is_terminal() {
                job.status = JobStatus::Completed;
                job.progress = 100;
                job.url = Some(url);
            }
        }
    }

    /// Record a failed render with a diagnostic detail. No-op on terminal
    /// records.
    pub async fn fail(&self, job_id: Uuid, error: String) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            if !job.status.is_terminal() {
                job.status = JobStatus::Failed;
                job.error = Some(error);
            }
        }
    }
}
