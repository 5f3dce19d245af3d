//! Notification payload carried on the message channel.

use common::CorrelationId;
use serde::{Deserialize, Serialize};

/// A confirmation notification queued for asynchronous delivery.
///
/// Carries no state of its own; its lifecycle (queued, delivered-and-acked,
/// dead-lettered) is owned entirely by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryMessage {
    /// Email address of the recipient.
    pub recipient: String,
    /// Message subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
    /// Correlation ID of the originating booking request.
    pub correlation_id: CorrelationId,
}

impl DeliveryMessage {
    /// Serializes the message to JSON bytes for publishing.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserializes a message from raw JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DeliveryMessage {
        DeliveryMessage {
            recipient: "student@example.com".to_string(),
            subject: "Algebra session confirmed".to_string(),
            body: "Hi Ada, your session is confirmed.".to_string(),
            correlation_id: CorrelationId::new("cid-1"),
        }
    }

    #[test]
    fn roundtrips_through_bytes() {
        let message = sample();
        let bytes = message.to_bytes().unwrap();
        let decoded = DeliveryMessage::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn wire_format_is_camel_case() {
        let json: serde_json::Value =
            serde_json::from_slice(&sample().to_bytes().unwrap()).unwrap();
        assert_eq!(json["recipient"], "student@example.com");
        assert_eq!(json["correlationId"], "cid-1");
    }

    #[test]
    fn rejects_malformed_payload() {
        assert!(DeliveryMessage::from_bytes(b"not json").is_err());
        assert!(DeliveryMessage::from_bytes(b"{\"recipient\":\"x\"}").is_err());
    }
}
