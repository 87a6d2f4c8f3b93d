//! Job Queue — in-memory FIFO drained by exactly one worker task.
//!
//! `JobQueue::start` is called once by the composition root. It returns the
//! cloneable submission handle (stored in `AppState`) and the `WorkerHandle`
//! that owns the worker's lifetime. Submission never waits on the worker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::jobs::processor::{JobProcessor, QueuedJob};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Job queue is shut down")]
    Closed,
}

#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::UnboundedSender<QueuedJob>,
    depth: Arc<AtomicUsize>,
}

/// Owns the worker task. Dropping it without `stop` also ends the worker once
/// it is between jobs.
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl JobQueue {
    pub fn start(processor: JobProcessor) -> (JobQueue, WorkerHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let depth = Arc::new(AtomicUsize::new(0));

        let task = tokio::spawn(run_worker(
            Arc::new(processor),
            receiver,
            shutdown_rx,
            Arc::clone(&depth),
        ));
        info!("Job worker started");

        (JobQueue { sender, depth }, WorkerHandle { shutdown, task })
    }

    /// Hands a job to the worker and returns immediately.
    pub fn enqueue(&self, job: QueuedJob) -> Result<(), QueueError> {
        let job_id = job.job_id.clone();
        self.depth.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(job).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Closed);
        }
        debug!("Enqueued job {job_id} (depth {})", self.depth());
        Ok(())
    }

    /// Jobs waiting to be picked up. The job in flight is not counted.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

impl WorkerHandle {
    /// Stops the worker after the job in flight, if any, reaches a terminal
    /// state. Jobs still waiting stay `queued` in the store.
    pub async fn stop(self) {
        info!("Stopping job worker...");
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Job worker terminated abnormally: {e}");
        }
        info!("Job worker stopped");
    }
}

async fn run_worker(
    processor: Arc<JobProcessor>,
    mut receiver: mpsc::UnboundedReceiver<QueuedJob>,
    mut shutdown: watch::Receiver<bool>,
    depth: Arc<AtomicUsize>,
) {
    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            next = receiver.recv() => match next {
                Some(job) => job,
                None => break,
            },
        };
        depth.fetch_sub(1, Ordering::SeqCst);

        // Each job runs in its own task so a panic is contained, but the worker
        // awaits it before taking the next one.
        let job_id = job.job_id.clone();
        let task_processor = Arc::clone(&processor);
        let outcome = tokio::spawn(async move { task_processor.process(job).await }).await;

        if let Err(e) = outcome {
            error!("Job {job_id} aborted unexpectedly: {e}");
            processor
                .record_failure(&job_id, "Internal error while processing the job")
                .await;
        }
    }

    let abandoned = depth.load(Ordering::SeqCst);
    if abandoned > 0 {
        info!("Job worker exiting with {abandoned} job(s) still queued");
    }
}
