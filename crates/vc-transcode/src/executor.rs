//! Bounded transcode worker pool.
//!
//! Workers drain a shared queue and run one ffmpeg child each. Completed
//! outputs are registered with the media library (the executor never writes
//! into the catalog itself). Failures remove the partial output and leave
//! the queue running; cancellation kills the children and drains whatever
//! is still queued.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use vc_av::{encode, ToolCommand, ToolRegistry};
use vc_core::config::TranscodeConfig;
use vc_core::events::{EventBus, EventPayload};
use vc_core::Error;
use vc_library::MediaLibrary;

use crate::job::TranscodeJob;

/// Queue depth before `enqueue` applies back-pressure.
const QUEUE_CAPACITY: usize = 256;

/// Handle to the running worker pool.
pub struct Executor {
    tx: mpsc::Sender<TranscodeJob>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<TranscodeJob>>>,
    inflight: Arc<Mutex<HashSet<PathBuf>>>,
    cancel: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
    bus: Arc<EventBus>,
}

impl Executor {
    /// Spawn `config.parallelism` workers and return the pool handle.
    ///
    /// `cancel` is typically a child of the server's shutdown token.
    pub fn start(
        library: Arc<MediaLibrary>,
        tools: Arc<ToolRegistry>,
        config: TranscodeConfig,
        bus: Arc<EventBus>,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<TranscodeJob>(QUEUE_CAPACITY);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let inflight: Arc<Mutex<HashSet<PathBuf>>> = Arc::new(Mutex::new(HashSet::new()));

        let mut workers = Vec::with_capacity(config.parallelism);
        for worker_id in 0..config.parallelism {
            let worker = Worker {
                id: worker_id,
                rx: rx.clone(),
                library: library.clone(),
                tools: tools.clone(),
                config: config.clone(),
                bus: bus.clone(),
                inflight: inflight.clone(),
                cancel: cancel.clone(),
            };
            workers.push(tokio::spawn(worker.run()));
        }

        Self {
            tx,
            rx,
            inflight,
            cancel,
            workers: Mutex::new(workers),
            bus,
        }
    }

    /// Queue jobs, skipping any whose target is already queued or running.
    ///
    /// Returns the number actually queued. The skip set is what makes
    /// re-planning over a partially processed queue a no-op.
    pub async fn enqueue(&self, jobs: Vec<TranscodeJob>) -> usize {
        let mut queued = 0;
        for job in jobs {
            {
                let mut inflight = self.inflight.lock();
                if !inflight.insert(job.target.clone()) {
                    continue;
                }
            }

            self.bus.broadcast(EventPayload::JobQueued {
                job_id: job.id,
                title: job.title.clone(),
                resolution: job.resolution,
                container: job.container,
            });

            if self.tx.send(job).await.is_err() {
                // Pool is shutting down; nothing more will be accepted.
                break;
            }
            queued += 1;
        }
        queued
    }

    /// Number of targets queued or currently transcoding.
    pub fn inflight_len(&self) -> usize {
        self.inflight.lock().len()
    }

    /// Cancel all work, kill running children, drain the queue, and wait
    /// for the workers to exit.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        // Drain whatever never reached a worker.
        {
            let mut rx = self.rx.lock().await;
            while let Ok(job) = rx.try_recv() {
                self.inflight.lock().remove(&job.target);
                self.bus.broadcast(EventPayload::JobCancelled { job_id: job.id });
            }
        }

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            let _ = worker.await;
        }
    }
}

/// One queue consumer.
struct Worker {
    id: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<TranscodeJob>>>,
    library: Arc<MediaLibrary>,
    tools: Arc<ToolRegistry>,
    config: TranscodeConfig,
    bus: Arc<EventBus>,
    inflight: Arc<Mutex<HashSet<PathBuf>>>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        tracing::debug!(worker = self.id, "Transcode worker started");

        loop {
            let job = {
                let mut rx = self.rx.lock().await;
                tokio::select! {
                    job = rx.recv() => job,
                    _ = self.cancel.cancelled() => None,
                }
            };

            let Some(job) = job else { break };

            if self.cancel.is_cancelled() {
                self.inflight.lock().remove(&job.target);
                self.bus.broadcast(EventPayload::JobCancelled { job_id: job.id });
                continue;
            }

            self.process(job).await;
        }

        tracing::debug!(worker = self.id, "Transcode worker stopped");
    }

    async fn process(&self, job: TranscodeJob) {
        let job_id = job.id;
        tracing::info!(
            job_id = %job_id,
            source = %job.source.display(),
            target = %job.target.display(),
            "Transcoding"
        );
        self.bus.broadcast(EventPayload::JobStarted { job_id });

        match self.execute(&job).await {
            Ok(()) => {
                self.bus.broadcast(EventPayload::JobCompleted { job_id });
                tracing::info!(job_id = %job_id, "Transcode complete");
            }
            Err(Error::Cancelled) => {
                remove_partial(&job.target);
                self.bus.broadcast(EventPayload::JobCancelled { job_id });
                tracing::info!(job_id = %job_id, "Transcode cancelled");
            }
            Err(e) => {
                remove_partial(&job.target);
                let error = e.to_string();
                tracing::warn!(job_id = %job_id, error = %error, "Transcode failed");
                self.bus.broadcast(EventPayload::JobFailed { job_id, error });
            }
        }

        self.inflight.lock().remove(&job.target);
    }

    async fn execute(&self, job: &TranscodeJob) -> vc_core::Result<()> {
        // Idempotence: an output left by a previous run is adopted as-is.
        if !job.target.is_file() {
            let ffmpeg = self.tools.require("ffmpeg")?;
            let args = encode::transcode_args(
                &job.source,
                &job.target,
                job.resolution,
                job.container,
                &self.config,
            );
            ToolCommand::new(ffmpeg)
                .args(args)
                .execute(&self.cancel)
                .await?;
        }

        self.library.add(job.target_entry())?;
        Ok(())
    }
}

/// Best-effort removal of a partially written target.
fn remove_partial(target: &Path) {
    if target.exists() {
        if let Err(e) = std::fs::remove_file(target) {
            tracing::warn!(target = %target.display(), error = %e, "Failed to remove partial output");
        }
    }
}
