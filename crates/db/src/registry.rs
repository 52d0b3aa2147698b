//! Stable worker identities.
//!
//! A worker that has never been issued an id presents the sentinel
//! [`UNKNOWN_WORKER_ID`](cfa_core::types::UNKNOWN_WORKER_ID) and receives
//! a freshly minted `worker_<n>`. Any other id is returned unchanged,
//! whether or not this registry minted it.

use serde::Serialize;
use cfa_core::types::is_unknown_worker;

use crate::error::DispatchError;
use crate::repositories::WorkerRepo;
use crate::DbPool;

/// Outcome of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub worker_id: String,
    /// The id was minted by this call.
    pub created: bool,
    /// The id is one this registry minted (now or earlier).
    pub known: bool,
}

/// Issues and recognizes worker identities.
#[derive(Clone)]
pub struct WorkerRegistry {
    pool: DbPool,
}

impl WorkerRegistry {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Register a worker presenting `presented_id`.
    pub async fn register(&self, presented_id: &str) -> Result<Registration, DispatchError> {
        if is_unknown_worker(presented_id) {
            let record = WorkerRepo::mint(&self.pool).await?;
            let worker_id = record
                .worker_id
                .unwrap_or_else(|| cfa_core::types::minted_worker_id(record.seq));
            tracing::info!(worker_id = %worker_id, "Minted new worker id");
            return Ok(Registration {
                worker_id,
                created: true,
                known: true,
            });
        }

        let known = WorkerRepo::touch(&self.pool, presented_id).await?;
        if known {
            tracing::debug!(worker_id = presented_id, "Worker logged in");
        } else {
            tracing::info!(worker_id = presented_id, "Accepting unrecognised worker id");
        }

        Ok(Registration {
            worker_id: presented_id.to_string(),
            created: false,
            known,
        })
    }

    /// Number of identities minted so far.
    pub async fn minted_count(&self) -> Result<i64, DispatchError> {
        Ok(WorkerRepo::count(&self.pool).await?)
    }
}
