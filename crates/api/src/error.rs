//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga::{BookingError, FailureClass};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Booking saga error.
    Booking(BookingError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Booking(err) => {
                let status = match err.class() {
                    FailureClass::NotFound => StatusCode::NOT_FOUND,
                    FailureClass::Conflict => StatusCode::CONFLICT,
                    FailureClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "booking request failed");
                }
                (status, err.to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        ApiError::Booking(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saga::RemoteError;

    fn status_of(err: BookingError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(
            status_of(BookingError::NotFound("tutor T1 not found".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn conflict_maps_to_409() {
        assert_eq!(
            status_of(BookingError::Conflict("slot taken".into())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn everything_else_maps_to_500() {
        assert_eq!(
            status_of(BookingError::CircuitOpen("identity down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(BookingError::saga_failed(BookingError::Remote(
                RemoteError::Timeout {
                    service: "scheduling_service".into()
                }
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn wrapped_not_found_keeps_its_classification() {
        assert_eq!(
            status_of(BookingError::saga_failed(BookingError::NotFound(
                "student gone".into()
            ))),
            StatusCode::NOT_FOUND
        );
    }
}
