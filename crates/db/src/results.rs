//! Storage for result assets uploaded by workers.
//!
//! Known limitation: file names carry the channel and the ordinal within
//! one upload, not the job. A later upload to the same channel overwrites
//! earlier `{channel}_{i}.png` files. The `uploads` table keeps one row
//! per stored asset with its job and worker, so the history survives
//! even when the file does not.

use std::path::{Path, PathBuf};

use cfa_core::naming::{result_asset_filename, sanitize_channel};

use crate::error::DispatchError;
use crate::repositories::UploadRepo;
use crate::DbPool;

/// One uploaded asset before it is stored.
#[derive(Debug, Clone)]
pub struct IncomingAsset {
    /// File name as sent by the worker; echoed back, never used on disk.
    pub original_name: String,
    pub data: Vec<u8>,
}

/// Writes result assets to `{upload_dir}/{channel}_{index}.png`.
///
/// Storing results never touches job state. An absent channel is not an
/// error; the assets land under the `unknown` channel.
pub struct ResultStore {
    upload_dir: PathBuf,
    pool: DbPool,
}

impl ResultStore {
    pub fn new(upload_dir: impl Into<PathBuf>, pool: DbPool) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            pool,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Store `assets` in order and return the original names of the
    /// stored ones.
    ///
    /// Assets with an empty original name are skipped and do not consume
    /// an ordinal.
    pub async fn store(
        &self,
        channel: Option<&str>,
        job_id: Option<&str>,
        worker_id: Option<&str>,
        assets: Vec<IncomingAsset>,
    ) -> Result<Vec<String>, DispatchError> {
        let channel = sanitize_channel(channel);
        tokio::fs::create_dir_all(&self.upload_dir).await?;

        let mut saved = Vec::with_capacity(assets.len());
        for asset in assets {
            if asset.original_name.is_empty() {
                continue;
            }
            let stored_name = result_asset_filename(&channel, saved.len());
            tokio::fs::write(self.upload_dir.join(&stored_name), &asset.data).await?;

            if let Err(e) =
                UploadRepo::record(&self.pool, &channel, job_id, worker_id, &stored_name).await
            {
                tracing::error!(error = %e, stored_name = %stored_name, "Failed to log upload");
            }
            tracing::debug!(channel = %channel, stored_name = %stored_name, "Stored result asset");
            saved.push(asset.original_name);
        }

        tracing::info!(channel = %channel, job_id, count = saved.len(), "Result assets stored");
        Ok(saved)
    }
}
