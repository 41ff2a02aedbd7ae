use ballast_store::StoreError;
use thiserror::Error;

/// Failures that abort a whole batch. Per-row failures are counted in the
/// batch report instead.
#[derive(Debug, Error)]
pub enum ReweighError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("store task failed: {0}")]
    Task(String),
}
