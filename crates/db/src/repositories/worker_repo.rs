//! Repository for the `workers` table.

use chrono::Utc;
use cfa_core::types::minted_worker_id;

use crate::models::worker::WorkerRecord;
use crate::DbPool;

/// Column list for `workers` queries.
const COLUMNS: &str = "seq, worker_id, created_at, last_seen_at";

/// Provides query operations for minted worker identities.
pub struct WorkerRepo;

impl WorkerRepo {
    /// Mint a new worker identity.
    ///
    /// The insert and the id assignment run in one write transaction, so
    /// concurrent callers are serialized by SQLite and each receives a
    /// distinct `AUTOINCREMENT` sequence (never reused, even after rows
    /// are deleted).
    pub async fn mint(pool: &DbPool) -> Result<WorkerRecord, sqlx::Error> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        let seq = sqlx::query("INSERT INTO workers (created_at, last_seen_at) VALUES (?1, ?1)")
            .bind(now)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        sqlx::query("UPDATE workers SET worker_id = ?2 WHERE seq = ?1")
            .bind(seq)
            .bind(minted_worker_id(seq))
            .execute(&mut *tx)
            .await?;

        let query = format!("SELECT {COLUMNS} FROM workers WHERE seq = ?1");
        let record = sqlx::query_as::<_, WorkerRecord>(&query)
            .bind(seq)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(record)
    }

    /// Find a minted worker by id.
    pub async fn find(pool: &DbPool, worker_id: &str) -> Result<Option<WorkerRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workers WHERE worker_id = ?1");
        sqlx::query_as::<_, WorkerRecord>(&query)
            .bind(worker_id)
            .fetch_optional(pool)
            .await
    }

    /// Bump `last_seen_at` for a minted worker. Returns `false` when the
    /// id was never minted here.
    pub async fn touch(pool: &DbPool, worker_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE workers SET last_seen_at = ?2 WHERE worker_id = ?1")
            .bind(worker_id)
            .bind(Utc::now())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of minted workers.
    pub async fn count(pool: &DbPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM workers")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}
