//! Audit event record.

use chrono::{DateTime, Utc};
use common::CorrelationId;
use serde::{Deserialize, Serialize};

/// Severity of a tracking event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Error,
}

/// An immutable audit record tied to one logical request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    /// Name of the emitting service.
    pub service: String,
    /// Correlation ID of the request this event belongs to.
    pub correlation_id: CorrelationId,
    /// Human-readable description of what happened.
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl TrackingEvent {
    /// Creates an INFO-level event stamped with the current time.
    pub fn info(
        service: impl Into<String>,
        correlation_id: &CorrelationId,
        message: impl Into<String>,
    ) -> Self {
        Self::new(service, correlation_id, message, Severity::Info)
    }

    /// Creates an ERROR-level event stamped with the current time.
    pub fn error(
        service: impl Into<String>,
        correlation_id: &CorrelationId,
        message: impl Into<String>,
    ) -> Self {
        Self::new(service, correlation_id, message, Severity::Error)
    }

    fn new(
        service: impl Into<String>,
        correlation_id: &CorrelationId,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            service: service.into(),
            correlation_id: correlation_id.clone(),
            message: message.into(),
            severity,
            timestamp: Utc::now(),
        }
    }
}
