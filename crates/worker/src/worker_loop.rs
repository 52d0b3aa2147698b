//! The per-worker control loop.
//!
//! ```text
//! Login -> PollIdle -> (sleep | PullJob) -> Execute -> Upload -> PollIdle
//! ```
//!
//! Only startup configuration errors are fatal, and those are handled
//! before the loop is built. Everything that goes wrong per poll or per
//! job is logged and the loop carries on. Cancellation is observed at
//! every sleep; a render in progress always runs to completion.

use std::time::{Duration, Instant};

use cfa_core::idle::IdleGate;
use cfa_core::job::Job;
use tokio_util::sync::CancellationToken;

use crate::checksum_index::ChecksumIndex;
use crate::dispatch_client::DispatchApi;
use crate::engine::{txt2img_params, RenderEngine};
use crate::error::WorkerError;
use crate::identity::IdentityFile;
use crate::telemetry::UtilizationSource;

/// Loop timing and mode.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub polling_interval: Duration,
    /// Stop after the first pulled job, whatever its outcome.
    pub single_job: bool,
}

/// Why [`WorkerLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Cancelled,
    SingleJobDone,
}

/// Per-job outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub completed: usize,
    pub failed: usize,
}

pub struct WorkerLoop<D, E> {
    dispatch: D,
    engine: E,
    telemetry: Option<Box<dyn UtilizationSource>>,
    gate: IdleGate,
    index: ChecksumIndex,
    identity: IdentityFile,
    settings: LoopSettings,
    stats: LoopStats,
}

impl<D: DispatchApi, E: RenderEngine> WorkerLoop<D, E> {
    /// Without `telemetry` the gate is degraded: every poll is eligible.
    pub fn new(
        dispatch: D,
        engine: E,
        telemetry: Option<Box<dyn UtilizationSource>>,
        mut gate: IdleGate,
        index: ChecksumIndex,
        identity: IdentityFile,
        settings: LoopSettings,
    ) -> Self {
        if telemetry.is_none() {
            gate.degrade();
        }
        Self {
            dispatch,
            engine,
            telemetry,
            gate,
            index,
            identity,
            settings,
            stats: LoopStats::default(),
        }
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Run until cancelled, or until one job was handled in single-job mode.
    pub async fn run(&mut self, cancel: CancellationToken) -> LoopExit {
        let Some(worker_id) = self.login(&cancel).await else {
            return LoopExit::Cancelled;
        };

        self.gate.initialize(Instant::now());

        loop {
            if cancel.is_cancelled() {
                return LoopExit::Cancelled;
            }

            let sample = self.sample();
            self.gate.tick(Instant::now(), sample);

            if !self.gate.is_eligible() {
                tracing::debug!(
                    idle_secs = self.gate.accumulated().as_secs(),
                    threshold_secs = self.gate.idle_threshold().as_secs(),
                    utilization = ?sample,
                    "GPU not idle long enough, waiting",
                );
                if !self.sleep(&cancel).await {
                    return LoopExit::Cancelled;
                }
                continue;
            }

            let checkpoints = self.index.hashes();
            let job = match self.dispatch.pull_job(&worker_id, &checkpoints).await {
                Ok(Some(job)) => job,
                Ok(None) => {
                    tracing::debug!(worker_id = %worker_id, "No jobs available, waiting");
                    if !self.sleep(&cancel).await {
                        return LoopExit::Cancelled;
                    }
                    continue;
                }
                Err(e) => {
                    tracing::warn!(worker_id = %worker_id, error = %e, "Job pull failed");
                    if !self.sleep(&cancel).await {
                        return LoopExit::Cancelled;
                    }
                    continue;
                }
            };

            let job_id = job.id.clone();
            match self.execute(&worker_id, job).await {
                Ok(images) => {
                    self.stats.completed += 1;
                    tracing::info!(worker_id = %worker_id, job_id = %job_id, images, "Job completed");
                }
                Err(e) => {
                    self.stats.failed += 1;
                    tracing::error!(worker_id = %worker_id, job_id = %job_id, error = %e, "Job failed");
                }
            }

            // Render time never counts toward the next idle period.
            self.gate.reset(Instant::now());

            if self.settings.single_job {
                return LoopExit::SingleJobDone;
            }
        }
    }

    /// Register with the dispatch service, retrying every polling
    /// interval until it answers. `None` if cancelled first.
    async fn login(&mut self, cancel: &CancellationToken) -> Option<String> {
        let presented = self.identity.load().await;

        loop {
            match self.dispatch.register(&presented).await {
                Ok(registration) => {
                    if registration.created {
                        tracing::info!(worker_id = %registration.worker_id, "Registered as new worker");
                    } else {
                        tracing::info!(worker_id = %registration.worker_id, "Logged in");
                    }
                    if let Err(e) = self.identity.save(&registration.worker_id).await {
                        tracing::warn!(
                            path = %self.identity.path().display(),
                            error = %e,
                            "Failed to persist worker id",
                        );
                    }
                    return Some(registration.worker_id);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Login failed, retrying");
                    if !self.sleep(cancel).await {
                        return None;
                    }
                }
            }
        }
    }

    /// Resolve, render and upload one job. Returns the image count.
    async fn execute(&self, worker_id: &str, job: Job) -> Result<usize, WorkerError> {
        let checkpoint = self
            .index
            .resolve(&job.model_checksum)
            .ok_or_else(|| WorkerError::ChecksumUnresolved(job.model_checksum.clone()))?;

        let seed: u64 = rand::random();
        let params = txt2img_params(&job, checkpoint, seed)?;
        tracing::info!(
            worker_id,
            job_id = %job.id,
            checkpoint = %params.checkpoint,
            seed,
            batch_size = params.batch_size,
            "Rendering job",
        );

        let images = self.engine.render(&params).await?;
        if images.is_empty() {
            tracing::warn!(job_id = %job.id, "Render produced no images, skipping upload");
            return Ok(0);
        }

        let count = images.len();
        self.dispatch.upload_result(worker_id, &job, images).await?;
        Ok(count)
    }

    /// One utilization sample; `None` when telemetry is absent or the
    /// read failed.
    fn sample(&self) -> Option<u32> {
        let source = self.telemetry.as_ref()?;
        match source.utilization() {
            Ok(percent) => Some(percent),
            Err(e) => {
                tracing::warn!(error = %e, "GPU utilization sample failed, counting as idle");
                None
            }
        }
    }

    /// Sleep one polling interval. `false` if cancelled meanwhile.
    async fn sleep(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.settings.polling_interval) => true,
        }
    }
}
