//! # Queue Errors

use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Request queue errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The worker has stopped; nothing more can be submitted
    #[error("request queue is closed")]
    Closed,

    /// The worker stopped before completing this request
    #[error("request #{0} was dropped before completion")]
    Dropped(u64),

    /// The worker task failed
    #[error("request queue worker failed: {0}")]
    Worker(String),
}

impl QueueError {
    pub fn code(&self) -> &'static str {
        match self {
            QueueError::Closed => "CRUDDY_QUEUE_CLOSED",
            QueueError::Dropped(_) => "CRUDDY_QUEUE_DROPPED",
            QueueError::Worker(_) => "CRUDDY_QUEUE_WORKER",
        }
    }
}
