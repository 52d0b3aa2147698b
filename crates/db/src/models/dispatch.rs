use serde::Serialize;
use sqlx::FromRow;
use cfa_core::types::Timestamp;

/// A queue descriptor handed to a worker.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DispatchRecord {
    /// Descriptor file name inside the queue directory.
    pub job_key: String,
    pub job_id: String,
    pub worker_id: String,
    pub dispatched_at: Timestamp,
}
