use serde::Serialize;
use sqlx::FromRow;
use cfa_core::types::Timestamp;

/// A worker identity minted by the registry.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkerRecord {
    pub seq: i64,
    /// Always set once the minting transaction commits.
    pub worker_id: Option<String>,
    pub created_at: Timestamp,
    pub last_seen_at: Timestamp,
}
