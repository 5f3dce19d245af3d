//! Email delivery trait and implementations.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use messaging::DeliveryMessage;
use thiserror::Error;

/// Errors raised while handing a message to the mail transport.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The message could not be assembled (bad address, bad content).
    #[error("invalid email message: {0}")]
    InvalidMessage(String),

    /// The transport refused or failed to send.
    #[error("email delivery failed: {0}")]
    Transport(String),
}

/// Side-effecting delivery of one notification.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &DeliveryMessage) -> Result<(), DeliveryError>;
}

/// SMTP-backed sender (lettre) talking to a plain relay.
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// Creates a sender relaying through `host:port`, sending as `from`.
    pub fn new(host: &str, port: u16, from: &str) -> Result<Self, DeliveryError> {
        let from = from
            .parse::<Mailbox>()
            .map_err(|e| DeliveryError::InvalidMessage(e.to_string()))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, message: &DeliveryMessage) -> Result<(), DeliveryError> {
        let recipient = message
            .recipient
            .parse::<Mailbox>()
            .map_err(|e| DeliveryError::InvalidMessage(e.to_string()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(&message.subject)
            .body(message.body.clone())
            .map_err(|e| DeliveryError::InvalidMessage(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map(drop)
            .map_err(|e| DeliveryError::Transport(e.to_string()))
    }
}

#[derive(Debug, Default)]
struct InMemoryEmailState {
    sent: Vec<DeliveryMessage>,
    fail_on_send: bool,
}

/// In-memory sender for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmailSender {
    state: Arc<RwLock<InMemoryEmailState>>,
}

impl InMemoryEmailSender {
    /// Creates a new sender with an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent sends fail.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Returns every delivered message, in order.
    pub fn sent(&self) -> Vec<DeliveryMessage> {
        self.state.read().unwrap().sent.clone()
    }

    /// Returns the number of delivered messages.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }
}

#[async_trait]
impl EmailSender for InMemoryEmailSender {
    async fn send(&self, message: &DeliveryMessage) -> Result<(), DeliveryError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_send {
            return Err(DeliveryError::Transport(
                "smtp connection refused".to_string(),
            ));
        }
        state.sent.push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::CorrelationId;

    fn message() -> DeliveryMessage {
        DeliveryMessage {
            recipient: "student@example.com".to_string(),
            subject: "Session confirmed".to_string(),
            body: "See you there.".to_string(),
            correlation_id: CorrelationId::new("cid-1"),
        }
    }

    #[tokio::test]
    async fn in_memory_sender_records_messages() {
        let sender = InMemoryEmailSender::new();
        sender.send(&message()).await.unwrap();

        assert_eq!(sender.sent_count(), 1);
        assert_eq!(sender.sent()[0].recipient, "student@example.com");
    }

    #[tokio::test]
    async fn in_memory_sender_fail_knob() {
        let sender = InMemoryEmailSender::new();
        sender.set_fail_on_send(true);

        let result = sender.send(&message()).await;
        assert!(matches!(result, Err(DeliveryError::Transport(_))));
        assert_eq!(sender.sent_count(), 0);
    }

    #[test]
    fn smtp_sender_rejects_invalid_from_address() {
        let result = SmtpEmailSender::new("localhost", 2525, "not an address");
        assert!(matches!(result, Err(DeliveryError::InvalidMessage(_))));
    }
}
