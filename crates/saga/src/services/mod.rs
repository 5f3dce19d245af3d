//! Gateways to the external identity and scheduling services.

pub mod identity;
pub mod scheduling;

/// Header carrying the correlation ID across HTTP hops.
pub const CORRELATION_HEADER: &str = "x-correlation-id";
