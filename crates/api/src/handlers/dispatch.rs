//! Worker registration and job pull.
//!
//! Both endpoints are `GET` with an optional JSON body, which is what
//! deployed workers send. The body is read raw and parsed here so an
//! absent body or missing `Content-Type` is not a rejection.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use cfa_core::job::Job;
use cfa_core::types::UNKNOWN_WORKER_ID;
use cfa_db::job_store::PullOutcome;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Body of `GET /api/init`.
#[derive(Debug, Deserialize)]
pub struct InitRequest {
    pub worker_id: Option<String>,
}

/// Response of `GET /api/init`.
#[derive(Debug, Serialize)]
pub struct InitResponse {
    pub worker_id: String,
    pub message: &'static str,
    /// The id was minted by this request.
    pub created: bool,
}

/// Optional body of `GET /api/get-job`.
#[derive(Debug, Default, Deserialize)]
pub struct GetJobRequest {
    /// Checkpoint hashes available on the worker.
    #[serde(default)]
    pub checkpoints: Vec<String>,
    #[serde(default)]
    pub worker_id: Option<String>,
}

/// GET /api/init
pub async fn init_worker(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<InitResponse>> {
    let request: Option<InitRequest> = parse_optional_body(&body)?;
    let presented = request
        .and_then(|r| r.worker_id)
        .ok_or_else(|| AppError::BadRequest("worker_id is required".into()))?;

    let registration = state.registry.register(&presented).await?;

    Ok(Json(InitResponse {
        worker_id: registration.worker_id,
        message: "Worker initialized successfully",
        created: registration.created,
    }))
}

/// GET /api/get-job
///
/// Hands out the oldest undispatched job. `checkpoints` is logged but
/// does not affect selection.
pub async fn get_job(State(state): State<AppState>, body: Bytes) -> AppResult<Json<Job>> {
    let request: GetJobRequest = parse_optional_body(&body)?.unwrap_or_default();
    let worker_id = request
        .worker_id
        .as_deref()
        .unwrap_or(UNKNOWN_WORKER_ID);

    match state
        .job_store
        .pull_job(worker_id, &request.checkpoints)
        .await?
    {
        PullOutcome::Dispatched(job) => Ok(Json(job)),
        PullOutcome::Empty => Err(AppError::NoJobAvailable("No jobs available".into())),
        PullOutcome::Exhausted => Err(AppError::NoJobAvailable(
            "All jobs have been processed".into(),
        )),
    }
}

/// Parse a JSON body that may legitimately be absent.
fn parse_optional_body<T: DeserializeOwned>(body: &Bytes) -> AppResult<Option<T>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))
}
