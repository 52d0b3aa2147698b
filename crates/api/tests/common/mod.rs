#![allow(dead_code)]

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use cfa_api::config::ServerConfig;
use cfa_api::router::build_app_router;
use cfa_api::state::AppState;

/// A running router over temp-dir queue, uploads and dispatch record.
pub struct TestApp {
    pub dir: TempDir,
    pub app: Router,
    pub pool: cfa_db::DbPool,
    pub queue_dir: PathBuf,
    pub upload_dir: PathBuf,
}

/// Build a test `ServerConfig` rooted at `root`.
pub fn test_config(root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        queue_dir: root.join("queue"),
        upload_dir: root.join("uploads"),
        db_path: root.join("dispatch.db"),
        request_timeout_secs: 30,
        max_upload_bytes: 1024 * 1024,
    }
}

/// Build the full application with an existing, empty queue directory.
pub async fn build_test_app() -> TestApp {
    let app = build_test_app_without_queue().await;
    std::fs::create_dir_all(&app.queue_dir).unwrap();
    app
}

/// Build the full application; the queue directory is not created.
pub async fn build_test_app_without_queue() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let pool = cfa_db::create_pool(&config.db_path).await.unwrap();
    cfa_db::run_migrations(&pool).await.unwrap();

    let queue_dir = config.queue_dir.clone();
    let upload_dir = config.upload_dir.clone();
    let app = build_app_router(AppState::new(pool.clone(), config));

    TestApp {
        dir,
        app,
        pool,
        queue_dir,
        upload_dir,
    }
}

/// A valid wire descriptor requested at `requested_at` (RFC 3339).
pub fn descriptor(job_id: &str, requested_at: &str) -> serde_json::Value {
    serde_json::json!({
        "job_id": job_id,
        "requested_at": requested_at,
        "started_at": null,
        "request_type": "generate",
        "requested_prompt": "a lighthouse at dusk",
        "negative_prompt": "blurry",
        "model": "5f2a",
        "steps": 25,
        "channel": "chan-42",
        "image_link": null,
        "resolution": "768x512",
        "batch_size": 2,
        "config_scale": 6.5
    })
}

/// Write a descriptor into the queue as `{file_stem}.json`.
pub fn enqueue(queue_dir: &Path, file_stem: &str, value: &serde_json::Value) {
    std::fs::write(
        queue_dir.join(format!("{file_stem}.json")),
        serde_json::to_vec(value).unwrap(),
    )
    .unwrap();
}

/// Send a GET, optionally with a JSON body (workers send bodies on GET).
pub async fn get(app: &Router, uri: &str, body: Option<serde_json::Value>) -> Response<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };
    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

/// One part of a `multipart/form-data` body.
pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub data: &'a [u8],
}

const BOUNDARY: &str = "cfa-test-boundary";

/// POST a multipart body built from `parts`.
pub async fn post_multipart(app: &Router, uri: &str, parts: &[Part<'_>]) -> Response<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: image/png\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Smallest byte string recognised as a PNG.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
