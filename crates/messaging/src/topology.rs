//! Queue and exchange names making up the broker topology.

/// Durable queue carrying confirmation notifications to the worker.
pub const NOTIFICATION_QUEUE: &str = "notification_email_queue";

/// Direct exchange receiving messages rejected without requeue.
pub const DEAD_LETTER_EXCHANGE: &str = "notification_dlx";

/// Catch-all queue bound to the dead-letter exchange with no routing key.
pub const DEAD_LETTER_QUEUE: &str = "notification_dlq";

/// Fire-and-forget audit event queue.
pub const TRACKING_QUEUE: &str = "tracking_events_queue";

/// Names of the declared queues and exchanges.
///
/// The main queue is declared with its `x-dead-letter-exchange` pointing at
/// the dead-letter exchange, so the broker itself routes rejected messages
/// to the dead-letter queue.
#[derive(Debug, Clone)]
pub struct QueueTopology {
    pub queue: String,
    pub dead_letter_exchange: String,
    pub dead_letter_queue: String,
    pub tracking_queue: String,
}

impl Default for QueueTopology {
    fn default() -> Self {
        Self {
            queue: NOTIFICATION_QUEUE.to_string(),
            dead_letter_exchange: DEAD_LETTER_EXCHANGE.to_string(),
            dead_letter_queue: DEAD_LETTER_QUEUE.to_string(),
            tracking_queue: TRACKING_QUEUE.to_string(),
        }
    }
}
