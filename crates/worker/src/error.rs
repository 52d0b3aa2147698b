use cfa_comfyui::renderer::RenderError;
use cfa_core::error::CoreError;

use crate::dispatch_client::DispatchClientError;

/// Why a single pulled job did not complete. None of these stop the
/// worker loop.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The job's model hash is not in the local checksum index.
    #[error("No local checkpoint for model hash {0}")]
    ChecksumUnresolved(String),

    /// The descriptor cannot be turned into render parameters.
    #[error(transparent)]
    InvalidJob(#[from] CoreError),

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    Dispatch(#[from] DispatchClientError),
}
