//! Message handler for the notification queue.

use std::sync::Arc;

use async_trait::async_trait;
use messaging::{DeliveryMessage, Disposition, MessageHandler};
use tracking::{Tracker, TrackingEvent};

use crate::email::EmailSender;

/// Service label stamped on the worker's tracking events.
pub const SERVICE_NAME: &str = "notification_service";

/// Consumes delivery events and performs the email side effect.
///
/// One message is processed at a time (the channel's concurrency contract),
/// so there are no parallel delivery attempts and failure attribution stays
/// simple. Parse and delivery failures are rejected without requeue (the
/// broker routes them to the dead-letter queue) and tracked with the raw
/// payload for forensics.
pub struct NotificationWorker<S: EmailSender> {
    sender: S,
    tracker: Arc<dyn Tracker>,
}

impl<S: EmailSender> NotificationWorker<S> {
    /// Creates a worker delivering through `sender`.
    pub fn new(sender: S, tracker: Arc<dyn Tracker>) -> Self {
        Self { sender, tracker }
    }

    async fn track_failure(&self, message: String, raw: &[u8]) {
        let payload = String::from_utf8_lossy(raw);
        self.tracker
            .emit(TrackingEvent::error(
                SERVICE_NAME,
                &common::CorrelationId::new("unknown"),
                format!("{message}; payload: {payload}"),
            ))
            .await;
    }
}

#[async_trait]
impl<S: EmailSender> MessageHandler for NotificationWorker<S> {
    async fn handle(&self, raw: &[u8]) -> Disposition {
        let message = match DeliveryMessage::from_bytes(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(error = %e, "unparseable notification payload");
                metrics::counter!("notifications_dead_lettered_total").increment(1);
                self.track_failure(format!("failed to parse notification payload: {e}"), raw)
                    .await;
                return Disposition::DeadLetter;
            }
        };

        match self.sender.send(&message).await {
            Ok(()) => {
                tracing::info!(
                    recipient = %message.recipient,
                    correlation_id = %message.correlation_id,
                    "notification delivered"
                );
                metrics::counter!("notifications_delivered_total").increment(1);
                self.tracker
                    .emit(TrackingEvent::info(
                        SERVICE_NAME,
                        &message.correlation_id,
                        format!("notification delivered to {}", message.recipient),
                    ))
                    .await;
                Disposition::Ack
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    recipient = %message.recipient,
                    correlation_id = %message.correlation_id,
                    "notification delivery failed, dead-lettering"
                );
                metrics::counter!("notifications_dead_lettered_total").increment(1);
                self.tracker
                    .emit(TrackingEvent::error(
                        SERVICE_NAME,
                        &message.correlation_id,
                        format!(
                            "delivery to {} failed: {e}; payload: {}",
                            message.recipient,
                            String::from_utf8_lossy(raw)
                        ),
                    ))
                    .await;
                Disposition::DeadLetter
            }
        }
    }
}
