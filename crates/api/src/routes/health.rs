use axum::extract::State;
use axum::{routing::get, Json, Router};
use cfa_db::job_store::QueueStats;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the dispatch record is reachable.
    pub db_healthy: bool,
    /// Descriptor counts; `null` while the queue directory is missing.
    pub queue: Option<QueueStats>,
    /// Worker ids minted so far.
    pub workers: i64,
}

/// GET /health -- service, dispatch record and queue status.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = cfa_db::health_check(&state.pool).await.is_ok();

    let queue = match state.job_store.stats().await {
        Ok(stats) => Some(stats),
        Err(e) => {
            tracing::debug!(error = %e, "Queue stats unavailable");
            None
        }
    };
    let workers = state.registry.minted_count().await.unwrap_or(0);

    let status = if db_healthy && queue.is_some() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        queue,
        workers,
    })
}

/// Mount health check routes (root level, not under `/api`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
