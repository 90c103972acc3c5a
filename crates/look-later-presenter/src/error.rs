use look_later_coordinator::CoordinatorError;
use look_later_core::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PresenterError>;

#[derive(Debug, Clone, Error)]
pub enum PresenterError {
    #[error("could not read links: {0}")]
    Store(#[from] StoreError),
    #[error("remove request failed: {0}")]
    Remove(#[from] CoordinatorError),
    #[error("could not open link: {0}")]
    Navigation(String),
}
