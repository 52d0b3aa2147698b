#![allow(dead_code)]

use std::path::{Path, PathBuf};

use cfa_db::DbPool;
use tempfile::TempDir;

/// A migrated dispatch database and an empty queue directory, both
/// living in a temp directory that is removed on drop.
pub struct TestEnv {
    pub dir: TempDir,
    pub pool: DbPool,
    pub queue_dir: PathBuf,
}

pub async fn setup() -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let pool = cfa_db::create_pool(&dir.path().join("dispatch.db"))
        .await
        .unwrap();
    cfa_db::run_migrations(&pool).await.unwrap();

    let queue_dir = dir.path().join("queue");
    std::fs::create_dir_all(&queue_dir).unwrap();

    TestEnv {
        dir,
        pool,
        queue_dir,
    }
}

/// A valid wire descriptor requested at `requested_at` (RFC 3339).
pub fn descriptor(job_id: &str, requested_at: &str) -> serde_json::Value {
    serde_json::json!({
        "job_id": job_id,
        "requested_at": requested_at,
        "started_at": null,
        "request_type": "generate",
        "requested_prompt": "a red fox in snow",
        "negative_prompt": null,
        "model": "c0ffee",
        "steps": 20,
        "channel": "chan-1",
        "image_link": null,
        "resolution": "512x512",
        "batch_size": 1,
        "config_scale": 7.0
    })
}

/// Write a descriptor into the queue as `{file_stem}.json`.
pub fn enqueue(queue_dir: &Path, file_stem: &str, value: &serde_json::Value) {
    std::fs::write(
        queue_dir.join(format!("{file_stem}.json")),
        serde_json::to_vec_pretty(value).unwrap(),
    )
    .unwrap();
}
