//! Query layer over the dispatch record, one unit struct per table.

pub mod dispatch_repo;
pub mod upload_repo;
pub mod worker_repo;

pub use dispatch_repo::DispatchRepo;
pub use upload_repo::UploadRepo;
pub use worker_repo::WorkerRepo;
