//! Message channel error types.

use thiserror::Error;

/// Errors that can occur during channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The broker connection is not currently available.
    ///
    /// Publishes hitting this are best-effort at the call sites that
    /// tolerate message loss (notifications, tracking); the background
    /// reconnect loop will restore the connection.
    #[error("message broker connection is not available")]
    NotConnected,

    /// The broker reported an operation failure.
    #[error("broker operation failed: {0}")]
    Broker(#[from] lapin::Error),

    /// Payload (de)serialization failed.
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for channel results.
pub type Result<T> = std::result::Result<T, ChannelError>;
