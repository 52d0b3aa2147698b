//! Repository for the `dispatches` table.

use cfa_core::types::Timestamp;

use crate::models::dispatch::DispatchRecord;
use crate::DbPool;

/// Column list for `dispatches` queries.
const COLUMNS: &str = "job_key, job_id, worker_id, dispatched_at";

/// Provides query operations for the dispatch ledger.
pub struct DispatchRepo;

impl DispatchRepo {
    /// Keys of every descriptor already handed out.
    pub async fn dispatched_keys(pool: &DbPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT job_key FROM dispatches")
            .fetch_all(pool)
            .await
    }

    /// Record a dispatch unless one already exists for `job_key`.
    ///
    /// Returns `true` when this call won the descriptor. The primary key
    /// on `job_key` makes this a compare-and-swap: of any number of
    /// concurrent claims, exactly one inserts a row.
    pub async fn try_claim(
        pool: &DbPool,
        job_key: &str,
        job_id: &str,
        worker_id: &str,
        dispatched_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO dispatches (job_key, job_id, worker_id, dispatched_at) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT (job_key) DO NOTHING",
        )
        .bind(job_key)
        .bind(job_id)
        .bind(worker_id)
        .bind(dispatched_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Find the dispatch of a descriptor.
    pub async fn find(pool: &DbPool, job_key: &str) -> Result<Option<DispatchRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM dispatches WHERE job_key = ?1");
        sqlx::query_as::<_, DispatchRecord>(&query)
            .bind(job_key)
            .fetch_optional(pool)
            .await
    }

    /// All dispatches to one worker, oldest first.
    pub async fn list_for_worker(
        pool: &DbPool,
        worker_id: &str,
    ) -> Result<Vec<DispatchRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM dispatches WHERE worker_id = ?1 ORDER BY dispatched_at ASC"
        );
        sqlx::query_as::<_, DispatchRecord>(&query)
            .bind(worker_id)
            .fetch_all(pool)
            .await
    }
}
