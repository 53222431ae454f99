use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("window capacity must be positive, got {0}")]
    InvalidCapacity(usize),

    #[error("batch size must be positive")]
    InvalidBatchSize,
}
