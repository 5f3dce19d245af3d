//! Repository error types.

use common::BookingId;
use thiserror::Error;

/// Errors reported by the booking repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No booking exists with the given ID.
    #[error("booking not found: {0}")]
    BookingNotFound(BookingId),

    /// The underlying store rejected the write.
    #[error("repository write failed: {0}")]
    WriteFailed(String),
}

/// Convenience type alias for repository results.
pub type Result<T> = std::result::Result<T, RepositoryError>;
