//! Saga error taxonomy.

use domain::RepositoryError;
use thiserror::Error;

/// Failures talking to a collaborator service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The call exceeded its fixed timeout.
    #[error("request to {service} timed out")]
    Timeout { service: String },

    /// The service could not be reached at all.
    #[error("could not reach {service}: {message}")]
    Connection { service: String, message: String },

    /// The service answered with a non-success status.
    #[error("{service} returned status {status}")]
    Status { service: String, status: u16 },

    /// The service answered with a body we could not interpret.
    #[error("{service} returned an unreadable response: {message}")]
    InvalidResponse { service: String, message: String },

    /// The circuit breaker rejected the call without a network attempt.
    #[error("{service} is temporarily unavailable (circuit breaker open)")]
    CircuitOpen { service: String },
}

/// Coarse status classification of a booking error, for the HTTP edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// 404-equivalent.
    NotFound,
    /// 409-equivalent.
    Conflict,
    /// 500-equivalent.
    Internal,
}

/// Errors surfaced by the booking saga.
#[derive(Debug, Error)]
pub enum BookingError {
    /// A referenced user does not exist. Terminal, no compensation.
    #[error("{0}")]
    NotFound(String),

    /// The requested slot is unavailable. Terminal, no compensation.
    #[error("{0}")]
    Conflict(String),

    /// Dependency protection engaged; terminal now, retryable later.
    #[error("{0}")]
    CircuitOpen(String),

    /// A collaborator service failed or timed out.
    #[error(transparent)]
    Remote(RemoteError),

    /// A repository write failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] RepositoryError),

    /// The saga failed after durable side effects existed; compensation was
    /// attempted before this was raised. Wraps the original cause, never
    /// the compensation outcome.
    #[error("booking request could not be completed: {source}")]
    SagaFailed {
        #[source]
        source: Box<BookingError>,
    },
}

impl BookingError {
    /// Wraps `cause` as a saga failure.
    pub fn saga_failed(cause: BookingError) -> Self {
        BookingError::SagaFailed {
            source: Box::new(cause),
        }
    }

    /// Returns the status classification of this error.
    ///
    /// A saga failure classifies as its original cause does.
    pub fn class(&self) -> FailureClass {
        match self {
            BookingError::NotFound(_) => FailureClass::NotFound,
            BookingError::Conflict(_) => FailureClass::Conflict,
            BookingError::SagaFailed { source } => source.class(),
            BookingError::CircuitOpen(_)
            | BookingError::Remote(_)
            | BookingError::Persistence(_) => FailureClass::Internal,
        }
    }
}

impl From<RemoteError> for BookingError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::CircuitOpen { .. } => BookingError::CircuitOpen(e.to_string()),
            other => BookingError::Remote(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_map_to_http_equivalents() {
        assert_eq!(
            BookingError::NotFound("student S1 not found".into()).class(),
            FailureClass::NotFound
        );
        assert_eq!(
            BookingError::Conflict("slot taken".into()).class(),
            FailureClass::Conflict
        );
        assert_eq!(
            BookingError::CircuitOpen("identity down".into()).class(),
            FailureClass::Internal
        );
        assert_eq!(
            BookingError::Remote(RemoteError::Timeout {
                service: "identity_service".into()
            })
            .class(),
            FailureClass::Internal
        );
    }

    #[test]
    fn saga_failed_classifies_as_its_cause() {
        let wrapped = BookingError::saga_failed(BookingError::Remote(RemoteError::Connection {
            service: "scheduling_service".into(),
            message: "connection refused".into(),
        }));
        assert_eq!(wrapped.class(), FailureClass::Internal);
        // The message names the original cause.
        assert!(wrapped.to_string().contains("connection refused"));
    }

    #[test]
    fn circuit_open_remote_error_becomes_circuit_open_variant() {
        let error: BookingError = RemoteError::CircuitOpen {
            service: "identity_service".into(),
        }
        .into();
        assert!(matches!(error, BookingError::CircuitOpen(_)));
    }
}
