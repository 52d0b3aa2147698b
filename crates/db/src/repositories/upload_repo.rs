//! Repository for the `uploads` table.

use chrono::Utc;

use crate::models::upload::UploadRecord;
use crate::DbPool;

const COLUMNS: &str = "id, channel, job_id, worker_id, stored_name, created_at";

/// Provides query operations for the result-asset log.
pub struct UploadRepo;

impl UploadRepo {
    /// Append one stored asset to the log.
    pub async fn record(
        pool: &DbPool,
        channel: &str,
        job_id: Option<&str>,
        worker_id: Option<&str>,
        stored_name: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO uploads (channel, job_id, worker_id, stored_name, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(channel)
        .bind(job_id)
        .bind(worker_id)
        .bind(stored_name)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Every asset stored for a channel, in upload order.
    pub async fn list_for_channel(
        pool: &DbPool,
        channel: &str,
    ) -> Result<Vec<UploadRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM uploads WHERE channel = ?1 ORDER BY id ASC");
        sqlx::query_as::<_, UploadRecord>(&query)
            .bind(channel)
            .fetch_all(pool)
            .await
    }
}
