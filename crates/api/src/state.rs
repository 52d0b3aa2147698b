use std::sync::Arc;

use cfa_db::job_store::JobStore;
use cfa_db::registry::WorkerRegistry;
use cfa_db::results::ResultStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; the stores sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Dispatch record connection pool.
    pub pool: cfa_db::DbPool,
    pub config: Arc<ServerConfig>,
    pub job_store: Arc<JobStore>,
    pub registry: WorkerRegistry,
    pub results: Arc<ResultStore>,
}

impl AppState {
    /// Wire the stores to `pool` and the directories named in `config`.
    pub fn new(pool: cfa_db::DbPool, config: ServerConfig) -> Self {
        Self {
            job_store: Arc::new(JobStore::new(&config.queue_dir, pool.clone())),
            registry: WorkerRegistry::new(pool.clone()),
            results: Arc::new(ResultStore::new(&config.upload_dir, pool.clone())),
            config: Arc::new(config),
            pool,
        }
    }
}
