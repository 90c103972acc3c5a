use look_later_core::StoreError;
use thiserror::Error;

/// Result type for coordinator round-trips.
pub type Result<T> = std::result::Result<T, CoordinatorError>;

#[derive(Debug, Clone, Error)]
pub enum CoordinatorError {
    #[error("coordinator channel failed: {0}")]
    Channel(String),
    #[error("coordinator did not answer in time: {0}")]
    Timeout(String),
    #[error("coordinator reported failure: {0}")]
    Rejected(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
