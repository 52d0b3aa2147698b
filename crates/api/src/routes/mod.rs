pub mod dispatch;
pub mod health;

use axum::Router;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /init                 register or re-identify a worker (GET)
/// /get-job              pull the oldest undispatched job (GET)
/// /upload               store result images (POST, multipart)
/// ```
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    Router::new().merge(dispatch::router(config.max_upload_bytes))
}
