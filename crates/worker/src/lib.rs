//! GPU worker: pulls jobs from the dispatch service when the local GPU
//! has been idle long enough, renders them on ComfyUI and uploads the
//! results.

pub mod checksum_index;
pub mod config;
pub mod dispatch_client;
pub mod engine;
pub mod error;
pub mod identity;
pub mod telemetry;
pub mod worker_loop;
