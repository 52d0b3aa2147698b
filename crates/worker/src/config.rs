use std::path::PathBuf;
use std::time::Duration;

use cfa_core::idle::{DEFAULT_IDLE_THRESHOLD, DEFAULT_IDLE_UTILIZATION_PERCENT};
use clap::Parser;

/// Command-line configuration of a worker process.
///
/// Every flag can also be set through the named environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "cfa-worker", version, about = "GPU worker for the image job queue")]
pub struct WorkerArgs {
    /// Directory searched recursively for `*.safetensors` checkpoints.
    #[arg(long, env = "CFA_CHECKPOINT_DIR", default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// File storing this worker's id.
    #[arg(long, env = "CFA_CLIENT_FILE", default_value = "client.json")]
    pub client_file: PathBuf,

    /// File storing the checkpoint hash index.
    #[arg(long, env = "CFA_CHECKSUM_DB", default_value = "checkpoint_db.json")]
    pub checksum_db: PathBuf,

    /// GPU index to monitor for idle state.
    #[arg(long, env = "CFA_GPU_INDEX", default_value_t = 0)]
    pub gpu_index: u32,

    /// Seconds the GPU must stay idle before a job is pulled.
    #[arg(long, env = "CFA_IDLE_THRESHOLD", default_value_t = DEFAULT_IDLE_THRESHOLD.as_secs())]
    pub idle_threshold: u64,

    /// Utilization percent at or below which the GPU counts as idle.
    #[arg(long, env = "CFA_IDLE_UTILIZATION", default_value_t = DEFAULT_IDLE_UTILIZATION_PERCENT)]
    pub idle_utilization: u32,

    /// Dispatch service base URL.
    #[arg(long, env = "CFA_JOB_SERVER", default_value = "http://127.0.0.1:5000")]
    pub job_server: String,

    /// ComfyUI `host:port`.
    #[arg(long, env = "CFA_COMFY_SERVER", default_value = "127.0.0.1:8188")]
    pub comfy_server: String,

    /// Seconds between polls.
    #[arg(long, env = "CFA_POLLING_INTERVAL", default_value_t = 30)]
    pub polling_interval: u64,

    /// Process a single job and exit.
    #[arg(long, env = "CFA_SINGLE_JOB")]
    pub single_job: bool,
}

impl WorkerArgs {
    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = WorkerArgs::try_parse_from(["cfa-worker"]).unwrap();
        assert_eq!(args.checkpoint_dir, PathBuf::from("checkpoints"));
        assert_eq!(args.client_file, PathBuf::from("client.json"));
        assert_eq!(args.gpu_index, 0);
        assert_eq!(args.idle_threshold(), Duration::from_secs(900));
        assert_eq!(args.idle_utilization, 10);
        assert_eq!(args.job_server, "http://127.0.0.1:5000");
        assert_eq!(args.comfy_server, "127.0.0.1:8188");
        assert_eq!(args.polling_interval(), Duration::from_secs(30));
        assert!(!args.single_job);
    }

    #[test]
    fn flags_override() {
        let args = WorkerArgs::try_parse_from([
            "cfa-worker",
            "--gpu-index",
            "2",
            "--idle-threshold",
            "60",
            "--single-job",
        ])
        .unwrap();
        assert_eq!(args.gpu_index, 2);
        assert_eq!(args.idle_threshold, 60);
        assert!(args.single_job);
    }
}
