/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Worker id a fresh worker presents before it has been issued one.
pub const UNKNOWN_WORKER_ID: &str = "N/A";

/// Prefix of every worker id minted by the registry (`worker_1`, `worker_2`, ...).
pub const MINTED_WORKER_PREFIX: &str = "worker_";

/// Whether `worker_id` is the sentinel asking the registry for a new identity.
pub fn is_unknown_worker(worker_id: &str) -> bool {
    worker_id == UNKNOWN_WORKER_ID
}

/// Format a registry sequence number as a worker id.
pub fn minted_worker_id(seq: i64) -> String {
    format!("{MINTED_WORKER_PREFIX}{seq}")
}
