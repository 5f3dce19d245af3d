//! Core channel traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// What a handler decided to do with a delivered message.
///
/// There is no automatic acknowledgment: every handler must return an
/// explicit disposition, and a `DeadLetter` rejection is final; the broker
/// routes the message to the dead-letter queue without requeueing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Processing succeeded; acknowledge and discard the message.
    Ack,
    /// Processing failed; reject without requeue, routing to the DLQ.
    DeadLetter,
}

/// Consumer-side message callback.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Processes one raw message payload and decides its fate.
    async fn handle(&self, raw: &[u8]) -> Disposition;
}

/// Publish/consume abstraction over a durable broker.
///
/// All implementations must be thread-safe (Send + Sync). Consumers receive
/// at most one in-flight message at a time per logical consumer.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Enqueues a raw payload on the named queue.
    ///
    /// Returns an error if the broker is unreachable; call sites that treat
    /// publishing as best-effort track and swallow that error.
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()>;

    /// Registers `handler` as the consumer for the named queue.
    ///
    /// Messages are delivered one at a time; the handler's disposition is
    /// translated into an explicit ack or a reject-without-requeue.
    async fn consume(&self, queue: &str, handler: Arc<dyn MessageHandler>) -> Result<()>;
}
