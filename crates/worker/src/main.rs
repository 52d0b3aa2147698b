use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cfa_comfyui::renderer::ComfyUIRenderer;
use cfa_core::idle::IdleGate;
use cfa_worker::checksum_index::{ChecksumIndex, ChecksumIndexError};
use cfa_worker::config::WorkerArgs;
use cfa_worker::dispatch_client::HttpDispatchClient;
use cfa_worker::identity::IdentityFile;
use cfa_worker::telemetry::{NvmlSource, UtilizationSource};
use cfa_worker::worker_loop::{LoopSettings, WorkerLoop};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cfa_worker=debug,cfa_comfyui=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = WorkerArgs::parse();
    tracing::info!(
        job_server = %args.job_server,
        comfy_server = %args.comfy_server,
        gpu_index = args.gpu_index,
        idle_threshold_secs = args.idle_threshold,
        polling_interval_secs = args.polling_interval,
        single_job = args.single_job,
        "Starting cfa-worker",
    );

    if !args.checkpoint_dir.is_dir() {
        tracing::error!(
            checkpoint_dir = %args.checkpoint_dir.display(),
            "Checkpoint directory does not exist",
        );
        std::process::exit(1);
    }

    // --- Checkpoint index ---
    let checksum_db = args.checksum_db.clone();
    let root = args.checkpoint_dir.clone();
    let indexed = tokio::task::spawn_blocking(move || {
        let mut index = ChecksumIndex::load(checksum_db);
        let result = index.ensure_indexed(&root);
        (index, result)
    })
    .await;

    let index = match indexed {
        Ok((index, Ok(_))) => index,
        Ok((_, Err(e @ ChecksumIndexError::MissingRoot(_)))) => {
            tracing::error!(error = %e, "Cannot index checkpoints");
            std::process::exit(1);
        }
        Ok((index, Err(e))) => {
            tracing::error!(
                error = %e,
                indexed = index.entries().len(),
                "Checkpoint indexing incomplete, continuing with the partial index",
            );
            index
        }
        Err(e) => {
            tracing::error!(error = %e, "Checkpoint indexing task failed");
            std::process::exit(1);
        }
    };

    // --- GPU telemetry ---
    let telemetry: Option<Box<dyn UtilizationSource>> = match NvmlSource::init(args.gpu_index) {
        Ok(source) => Some(Box::new(source)),
        Err(e) => {
            tracing::warn!(
                gpu_index = args.gpu_index,
                error = %e,
                "GPU telemetry unavailable, treating the GPU as always idle",
            );
            None
        }
    };

    let mut worker = WorkerLoop::new(
        HttpDispatchClient::new(&args.job_server),
        ComfyUIRenderer::new(&args.comfy_server),
        telemetry,
        IdleGate::new(args.idle_threshold(), args.idle_utilization),
        index,
        IdentityFile::new(&args.client_file),
        LoopSettings {
            polling_interval: args.polling_interval(),
            single_job: args.single_job,
        },
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    let exit = worker.run(cancel).await;
    let stats = worker.stats();
    tracing::info!(
        ?exit,
        completed = stats.completed,
        failed = stats.failed,
        "Worker stopped",
    );
}

/// Wait for SIGINT or SIGTERM. A job already rendering finishes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), stopping after the current step");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, stopping after the current step");
        }
    }
}
