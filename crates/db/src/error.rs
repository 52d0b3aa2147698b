use std::path::PathBuf;

/// Errors from the job store, worker registry and result store.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The queue directory is missing. Not fatal: producers may create it
    /// later, so callers retry on the next poll.
    #[error("Queue directory {} does not exist", .0.display())]
    QueueUnavailable(PathBuf),

    /// Reading the queue or writing result assets failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A query against the dispatch record failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
