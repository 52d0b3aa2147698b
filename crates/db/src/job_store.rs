//! Directory-backed job queue.
//!
//! Every `*.json` file in the queue directory is one pending job
//! descriptor. [`JobStore::pull_job`] hands out the oldest descriptor
//! that has not been dispatched yet and records the dispatch in the
//! `dispatches` table, so a descriptor is returned at most once, across
//! concurrent callers and service restarts.
//!
//! Known limitations, kept on purpose:
//!
//! * The worker's available checkpoints do not influence selection;
//!   any worker can be handed a job it cannot render.
//! * A dispatched job is never reclaimed. If its worker dies, the job
//!   stays dispatched and is never completed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use cfa_core::job::Job;

use crate::error::DispatchError;
use crate::repositories::DispatchRepo;
use crate::DbPool;

/// File extension of job descriptors.
const DESCRIPTOR_EXTENSION: &str = "json";

/// A parsed descriptor together with where it came from.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    /// File name inside the queue directory; the dispatch key.
    pub key: String,
    pub job: Job,
    pub modified: SystemTime,
}

/// Result of a pull attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum PullOutcome {
    /// The job now belongs to the caller.
    Dispatched(Job),
    /// The queue directory holds no descriptors.
    Empty,
    /// Every descriptor has already been dispatched.
    Exhausted,
}

/// Descriptor counts for status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub dispatched: usize,
}

/// Pending job descriptors plus their dispatch record.
pub struct JobStore {
    queue_dir: PathBuf,
    pool: DbPool,
    /// Serializes the scan-then-claim sequence within this process.
    claim_lock: Mutex<()>,
}

impl JobStore {
    pub fn new(queue_dir: impl Into<PathBuf>, pool: DbPool) -> Self {
        Self {
            queue_dir: queue_dir.into(),
            pool,
            claim_lock: Mutex::new(()),
        }
    }

    pub fn queue_dir(&self) -> &Path {
        &self.queue_dir
    }

    /// Hand the oldest undispatched job to `worker_id`.
    ///
    /// Descriptors are ordered by `requested_at`, then file modification
    /// time, then file name. `available_checksums` is accepted for
    /// protocol compatibility and ignored. The returned job has
    /// `started_at` set and, if the descriptor had no `job_id`, the file
    /// stem as its id.
    pub async fn pull_job(
        &self,
        worker_id: &str,
        available_checksums: &[String],
    ) -> Result<PullOutcome, DispatchError> {
        let _guard = self.claim_lock.lock().await;

        let queued = self.scan().await?;
        if queued.is_empty() {
            return Ok(PullOutcome::Empty);
        }

        tracing::debug!(
            worker_id,
            checkpoints = available_checksums.len(),
            descriptors = queued.len(),
            "Selecting next job",
        );

        let dispatched: HashSet<String> = DispatchRepo::dispatched_keys(&self.pool)
            .await?
            .into_iter()
            .collect();

        for QueuedJob { key, mut job, .. } in queued {
            if dispatched.contains(&key) {
                continue;
            }
            if job.id.is_empty() {
                job.id = descriptor_stem(&key).to_string();
            }

            let now = Utc::now();
            // Another service process sharing the record may win the row.
            if !DispatchRepo::try_claim(&self.pool, &key, &job.id, worker_id, now).await? {
                tracing::debug!(job_key = %key, "Descriptor claimed concurrently, skipping");
                continue;
            }

            job.started_at = Some(now);
            tracing::info!(worker_id, job_id = %job.id, job_key = %key, "Job dispatched");
            return Ok(PullOutcome::Dispatched(job));
        }

        Ok(PullOutcome::Exhausted)
    }

    /// Pending vs dispatched descriptor counts.
    pub async fn stats(&self) -> Result<QueueStats, DispatchError> {
        let queued = self.scan().await?;
        let dispatched: HashSet<String> = DispatchRepo::dispatched_keys(&self.pool)
            .await?
            .into_iter()
            .collect();

        let dispatched_count = queued.iter().filter(|q| dispatched.contains(&q.key)).count();
        Ok(QueueStats {
            pending: queued.len() - dispatched_count,
            dispatched: dispatched_count,
        })
    }

    /// Read and order every valid descriptor in the queue directory.
    ///
    /// Files that fail to parse or validate are skipped with a warning.
    pub async fn scan(&self) -> Result<Vec<QueuedJob>, DispatchError> {
        if !tokio::fs::try_exists(&self.queue_dir).await? {
            return Err(DispatchError::QueueUnavailable(self.queue_dir.clone()));
        }

        let mut entries = tokio::fs::read_dir(&self.queue_dir).await?;
        let mut queued = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DESCRIPTOR_EXTENSION) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let key = entry.file_name().to_string_lossy().into_owned();

            match read_descriptor(&path).await {
                Ok(job) => queued.push(QueuedJob {
                    key,
                    job,
                    modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                }),
                Err(reason) => {
                    tracing::warn!(job_key = %key, %reason, "Skipping malformed job descriptor");
                }
            }
        }

        queued.sort_by(|a, b| {
            a.job
                .requested_at
                .cmp(&b.job.requested_at)
                .then(a.modified.cmp(&b.modified))
                .then_with(|| a.key.cmp(&b.key))
        });
        Ok(queued)
    }
}

/// Parse and validate one descriptor, describing any failure as text.
async fn read_descriptor(path: &Path) -> Result<Job, String> {
    let raw = tokio::fs::read(path).await.map_err(|e| e.to_string())?;
    let job: Job = serde_json::from_slice(&raw).map_err(|e| e.to_string())?;
    job.validate().map_err(|e| e.to_string())?;
    Ok(job)
}

/// `"job-17.json"` -> `"job-17"`.
fn descriptor_stem(key: &str) -> &str {
    key.strip_suffix(".json").unwrap_or(key)
}
