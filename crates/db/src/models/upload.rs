use serde::Serialize;
use sqlx::FromRow;
use cfa_core::types::Timestamp;

/// One stored result asset.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UploadRecord {
    pub id: i64,
    pub channel: String,
    pub job_id: Option<String>,
    pub worker_id: Option<String>,
    pub stored_name: String,
    pub created_at: Timestamp,
}
