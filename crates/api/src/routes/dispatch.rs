use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{dispatch, upload};
use crate::state::AppState;

/// Worker-facing dispatch routes.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/init", get(dispatch::init_worker))
        .route("/get-job", get(dispatch::get_job))
        .route(
            "/upload",
            post(upload::upload_images).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}
