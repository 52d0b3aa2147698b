//! Result image upload.

use axum::extract::{Multipart, Query, State};
use axum::Json;
use cfa_db::results::IncomingAsset;
use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Multipart field carrying the images.
const IMAGES_FIELD: &str = "images";
/// Optional multipart text field attributing the upload to a worker.
const WORKER_ID_FIELD: &str = "worker_id";

/// Query parameters for the upload endpoint.
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub channel: Option<String>,
    pub job_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    /// Original names of the stored images, in upload order.
    pub files: Vec<String>,
}

/// POST /api/upload?channel=<id>&job_id=<id>
///
/// Every non-empty `images` part must be a PNG; the request is rejected
/// before anything is written otherwise. Parts without a file name are
/// ignored.
pub async fn upload_images(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut saw_images = false;
    let mut worker_id: Option<String> = None;
    let mut assets = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            IMAGES_FIELD => {
                saw_images = true;
                let original_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;

                if !original_name.is_empty() && !is_png(&data) {
                    return Err(AppError::BadRequest(format!(
                        "'{original_name}' is not a PNG image"
                    )));
                }
                assets.push(IncomingAsset {
                    original_name,
                    data: data.to_vec(),
                });
            }
            WORKER_ID_FIELD => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                worker_id = Some(text);
            }
            _ => {}
        }
    }

    if !saw_images {
        return Err(AppError::BadRequest("No 'images' field in request".into()));
    }

    let files = state
        .results
        .store(
            params.channel.as_deref(),
            params.job_id.as_deref(),
            worker_id.as_deref(),
            assets,
        )
        .await?;

    Ok(Json(UploadResponse {
        message: "Images uploaded",
        files,
    }))
}

fn is_png(data: &[u8]) -> bool {
    matches!(image::guess_format(data), Ok(ImageFormat::Png))
}
