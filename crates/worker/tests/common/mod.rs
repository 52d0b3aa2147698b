#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cfa_comfyui::processor::CompletionError;
use cfa_comfyui::renderer::RenderError;
use cfa_comfyui::workflow::Txt2ImgParams;
use cfa_core::idle::IdleGate;
use cfa_core::job::Job;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use cfa_worker::checksum_index::ChecksumIndex;
use cfa_worker::dispatch_client::{DispatchApi, DispatchClientError, Registration};
use cfa_worker::engine::RenderEngine;
use cfa_worker::identity::IdentityFile;
use cfa_worker::telemetry::{TelemetryError, UtilizationSource};
use cfa_worker::worker_loop::{LoopSettings, WorkerLoop};

/// Contents of the single checkpoint every test environment indexes.
pub const CHECKPOINT_BYTES: &[u8] = b"fake model weights";
pub const CHECKPOINT_NAME: &str = "sdxl/base.safetensors";

pub fn checkpoint_hash() -> String {
    cfa_core::hashing::sha256_hex(CHECKPOINT_BYTES)
}

/// A job descriptor as the service would hand it out.
pub fn job(id: &str, model: &str) -> Job {
    serde_json::from_value(serde_json::json!({
        "job_id": id,
        "requested_at": "2024-05-01T10:00:00Z",
        "started_at": "2024-05-01T10:05:00Z",
        "request_type": "generate",
        "requested_prompt": "an owl on a branch",
        "negative_prompt": null,
        "model": model,
        "steps": 20,
        "channel": "chan-9",
        "image_link": null,
        "resolution": "512x512",
        "batch_size": 2,
        "config_scale": 7.0
    }))
    .unwrap()
}

// ---------------------------------------------------------------------------
// Fake dispatch service
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct DispatchLog {
    pub jobs: VecDeque<Job>,
    /// Registration attempts still to fail.
    pub register_failures: usize,
    pub register_attempts: usize,
    pub presented_ids: Vec<String>,
    pub pulls: usize,
    /// When each job was handed out.
    pub handed_out_at: Vec<Instant>,
    pub fail_uploads: bool,
    /// `(worker_id, channel, job_id, image count)`
    pub uploads: Vec<(String, String, String, usize)>,
}

#[derive(Clone, Default)]
pub struct FakeDispatch {
    pub log: Arc<Mutex<DispatchLog>>,
    /// Cancelled the first time a pull finds no job.
    pub cancel_when_drained: Option<CancellationToken>,
}

impl FakeDispatch {
    pub fn with_jobs(jobs: Vec<Job>) -> Self {
        let fake = Self::default();
        fake.log.lock().unwrap().jobs = jobs.into();
        fake
    }
}

#[async_trait]
impl DispatchApi for FakeDispatch {
    async fn register(&self, worker_id: &str) -> Result<Registration, DispatchClientError> {
        let mut log = self.log.lock().unwrap();
        log.register_attempts += 1;
        if log.register_failures > 0 {
            log.register_failures -= 1;
            return Err(DispatchClientError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        log.presented_ids.push(worker_id.to_string());

        if worker_id == "N/A" {
            Ok(Registration {
                worker_id: "worker_1".into(),
                created: true,
            })
        } else {
            Ok(Registration {
                worker_id: worker_id.to_string(),
                created: false,
            })
        }
    }

    async fn pull_job(
        &self,
        _worker_id: &str,
        _checkpoints: &[String],
    ) -> Result<Option<Job>, DispatchClientError> {
        let mut log = self.log.lock().unwrap();
        log.pulls += 1;
        let job = log.jobs.pop_front();
        if job.is_some() {
            log.handed_out_at.push(Instant::now());
        } else {
            if let Some(cancel) = &self.cancel_when_drained {
                cancel.cancel();
            }
        }
        Ok(job)
    }

    async fn upload_result(
        &self,
        worker_id: &str,
        job: &Job,
        images: Vec<Vec<u8>>,
    ) -> Result<(), DispatchClientError> {
        let mut log = self.log.lock().unwrap();
        if log.fail_uploads {
            return Err(DispatchClientError::UploadFailed {
                status: 500,
                body: "disk full".into(),
            });
        }
        log.uploads.push((
            worker_id.to_string(),
            job.requester_channel.clone(),
            job.id.clone(),
            images.len(),
        ));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fake render engine
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct FakeEngine {
    pub renders: Arc<Mutex<Vec<Txt2ImgParams>>>,
    /// When each render returned.
    pub finished_at: Arc<Mutex<Vec<Instant>>>,
    pub fail: bool,
    /// Simulated render time.
    pub delay: Duration,
}

#[async_trait]
impl RenderEngine for FakeEngine {
    async fn render(&self, params: &Txt2ImgParams) -> Result<Vec<Vec<u8>>, RenderError> {
        self.renders.lock().unwrap().push(params.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.finished_at.lock().unwrap().push(Instant::now());
        if self.fail {
            return Err(RenderError::Completion(CompletionError::Interrupted));
        }
        Ok((0..params.batch_size).map(|i| vec![i as u8; 4]).collect())
    }
}

// ---------------------------------------------------------------------------
// Fake telemetry
// ---------------------------------------------------------------------------

pub struct FixedUtilization(pub u32);

impl UtilizationSource for FixedUtilization {
    fn utilization(&self) -> Result<u32, TelemetryError> {
        Ok(self.0)
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Temp checkpoint directory (one indexed checkpoint) and client file path.
pub struct WorkerEnv {
    pub dir: TempDir,
    pub client_file: PathBuf,
    pub index: ChecksumIndex,
}

pub fn setup() -> WorkerEnv {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("checkpoints");
    let checkpoint = root.join(CHECKPOINT_NAME);
    std::fs::create_dir_all(checkpoint.parent().unwrap()).unwrap();
    std::fs::write(&checkpoint, CHECKPOINT_BYTES).unwrap();

    let mut index = ChecksumIndex::load(dir.path().join("checkpoint_db.json"));
    index.ensure_indexed(&root).unwrap();

    WorkerEnv {
        client_file: dir.path().join("client.json"),
        dir,
        index,
    }
}

pub const FAST_POLL: Duration = Duration::from_millis(5);

/// A loop with a degraded (always idle) gate.
pub fn idle_loop(
    env: &WorkerEnv,
    dispatch: FakeDispatch,
    engine: FakeEngine,
    single_job: bool,
) -> WorkerLoop<FakeDispatch, FakeEngine> {
    WorkerLoop::new(
        dispatch,
        engine,
        None,
        IdleGate::new(Duration::from_secs(900), 10),
        env.index.clone(),
        IdentityFile::new(&env.client_file),
        LoopSettings {
            polling_interval: FAST_POLL,
            single_job,
        },
    )
}
