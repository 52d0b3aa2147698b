/// Domain-level errors shared across crates.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Input failed a domain rule.
    #[error("Validation error: {0}")]
    Validation(String),
}
