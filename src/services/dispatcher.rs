use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use crate::services::jobs::{JobStore, QueuedJob};
use crate::services::pipeline::PosterPipeline;

/// Rendering is CPU/IO heavy; cap concurrent jobs so it cannot starve the
/// process.
const MAX_CONCURRENT_RENDERS: usize = 2;

/// Single-consumer dispatch loop feeding a bounded worker pool.
///
/// Jobs are dequeued in FIFO order and consumed at most once; completion
/// order across workers is not guaranteed. Every worker-level fault becomes a
/// job record mutation, never a panic out of the loop.
pub struct Dispatcher {
    handle: JoinHandle<()>,
}

impl Dispatcher {
    pub fn spawn(
        store: Arc<JobStore>,
        pipeline: Arc<PosterPipeline>,
        mut queue: mpsc::UnboundedReceiver<QueuedJob>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let pool = Arc::new(Semaphore::new(MAX_CONCURRENT_RENDERS));

            while let Some(job) = queue.recv().await {
                metrics::gauge!("poster_queue_depth").decrement(1.0);

                let Ok(permit) = pool.clone().acquire_owned().await else {
                    break;
                };
                let store = store.clone();
                let pipeline = pipeline.clone();

                tokio::spawn(async move {
                    process_job(&store, &pipeline, job).await;
                    drop(permit);
                });
            }

            tracing::info!("Job queue closed, dispatcher loop exiting");
        });

        Self { handle }
    }

    /// Cancel the consumption loop. In-flight jobs are abandoned; this is a
    /// best-effort pipeline, not a transactional one.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

async fn process_job(store: &JobStore, pipeline: &PosterPipeline, job: QueuedJob) {
    tracing::info!(job_id = %job.job_id, city = %job.params.city, "Processing poster job");
    store.set_processing(job.job_id).await;

    let start = Instant::now();
    match pipeline.generate(&job.params).await {
        Ok(poster) => {
            store.complete(job.job_id, poster.url.clone()).await;
            metrics::counter!("poster_jobs_completed").increment(1);
            metrics::histogram!("poster_render_seconds").record(start.elapsed().as_secs_f64());
            tracing::info!(
                job_id = %job.job_id,
                url = %poster.url,
                path = %poster.path.display(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Job completed"
            );
        }
        Err(e) => {
            store.fail(job.job_id, e.to_string()).await;
            metrics::counter!("poster_jobs_failed").increment(1);
            tracing::error!(job_id = %job.job_id, error = %e, "Job failed");
        }
    }
}
