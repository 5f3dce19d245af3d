//! Correlation ID extraction for inbound requests.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::CorrelationId;
use saga::services::CORRELATION_HEADER;

/// Extractor yielding the request's correlation ID.
///
/// Taken from the `X-Correlation-ID` header when the caller supplied one,
/// freshly generated otherwise, and propagated unchanged from here on.
pub struct Correlation(pub CorrelationId);

impl<S> FromRequestParts<S> for Correlation
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .headers
            .get(CORRELATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(CorrelationId::new)
            .unwrap_or_else(CorrelationId::generate);
        Ok(Self(correlation_id))
    }
}
