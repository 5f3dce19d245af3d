//! In-memory channel implementation for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::channel::{Disposition, MessageChannel, MessageHandler};
use crate::error::{ChannelError, Result};

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Vec<u8>>,
    handler: Option<Arc<dyn MessageHandler>>,
}

/// In-memory message channel with dead-letter semantics.
///
/// Mirrors the broker contract: per-queue FIFO delivery, a single consumer
/// per queue, one in-flight message at a time, and rejected messages moved
/// to an inspectable dead-letter store with no redelivery.
#[derive(Clone, Default)]
pub struct InMemoryChannel {
    queues: Arc<Mutex<HashMap<String, QueueState>>>,
    dead_letters: Arc<Mutex<Vec<Vec<u8>>>>,
    // Serializes deliveries across the channel, like prefetch(1).
    delivery_gate: Arc<Mutex<()>>,
    fail_publish: Arc<AtomicBool>,
}

impl InMemoryChannel {
    /// Creates a new empty in-memory channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent publishes fail as if the broker were unreachable.
    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Returns the messages waiting on the named queue (no consumer yet).
    pub async fn pending(&self, queue: &str) -> Vec<Vec<u8>> {
        let queues = self.queues.lock().await;
        queues
            .get(queue)
            .map(|q| q.pending.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of messages waiting on the named queue.
    pub async fn pending_count(&self, queue: &str) -> usize {
        let queues = self.queues.lock().await;
        queues.get(queue).map(|q| q.pending.len()).unwrap_or(0)
    }

    /// Returns all dead-lettered payloads, in rejection order.
    pub async fn dead_letters(&self) -> Vec<Vec<u8>> {
        self.dead_letters.lock().await.clone()
    }

    /// Returns the number of dead-lettered messages.
    pub async fn dead_letter_count(&self) -> usize {
        self.dead_letters.lock().await.len()
    }

    async fn dispatch(&self, handler: Arc<dyn MessageHandler>, payload: Vec<u8>) {
        let _in_flight = self.delivery_gate.lock().await;
        match handler.handle(&payload).await {
            Disposition::Ack => {}
            Disposition::DeadLetter => self.dead_letters.lock().await.push(payload),
        }
    }
}

#[async_trait]
impl MessageChannel for InMemoryChannel {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(ChannelError::NotConnected);
        }

        let handler = {
            let mut queues = self.queues.lock().await;
            let state = queues.entry(queue.to_string()).or_default();
            match &state.handler {
                Some(handler) => Some(handler.clone()),
                None => {
                    state.pending.push_back(payload.to_vec());
                    None
                }
            }
        };

        if let Some(handler) = handler {
            self.dispatch(handler, payload.to_vec()).await;
        }
        Ok(())
    }

    async fn consume(&self, queue: &str, handler: Arc<dyn MessageHandler>) -> Result<()> {
        let backlog = {
            let mut queues = self.queues.lock().await;
            let state = queues.entry(queue.to_string()).or_default();
            state.handler = Some(handler.clone());
            std::mem::take(&mut state.pending)
        };

        for payload in backlog {
            self.dispatch(handler.clone(), payload).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct RecordingHandler {
        disposition: Disposition,
        calls: AtomicUsize,
        seen: Mutex<Vec<Vec<u8>>>,
    }

    impl RecordingHandler {
        fn new(disposition: Disposition) -> Arc<Self> {
            Arc::new(Self {
                disposition,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MessageHandler for RecordingHandler {
        async fn handle(&self, raw: &[u8]) -> Disposition {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().await.push(raw.to_vec());
            self.disposition
        }
    }

    #[tokio::test]
    async fn publish_without_consumer_queues_message() {
        let channel = InMemoryChannel::new();
        channel.publish("q", b"hello").await.unwrap();

        assert_eq!(channel.pending_count("q").await, 1);
        assert_eq!(channel.pending("q").await, vec![b"hello".to_vec()]);
    }

    #[tokio::test]
    async fn consume_drains_backlog_in_order() {
        let channel = InMemoryChannel::new();
        channel.publish("q", b"first").await.unwrap();
        channel.publish("q", b"second").await.unwrap();

        let handler = RecordingHandler::new(Disposition::Ack);
        channel.consume("q", handler.clone()).await.unwrap();

        assert_eq!(handler.calls(), 2);
        let seen = handler.seen.lock().await;
        assert_eq!(*seen, vec![b"first".to_vec(), b"second".to_vec()]);
        assert_eq!(channel.pending_count("q").await, 0);
    }

    #[tokio::test]
    async fn publish_after_consume_delivers_immediately() {
        let channel = InMemoryChannel::new();
        let handler = RecordingHandler::new(Disposition::Ack);
        channel.consume("q", handler.clone()).await.unwrap();

        channel.publish("q", b"live").await.unwrap();

        assert_eq!(handler.calls(), 1);
        assert_eq!(channel.pending_count("q").await, 0);
    }

    #[tokio::test]
    async fn rejected_message_is_dead_lettered_and_not_redelivered() {
        let channel = InMemoryChannel::new();
        let handler = RecordingHandler::new(Disposition::DeadLetter);
        channel.consume("q", handler.clone()).await.unwrap();

        channel.publish("q", b"poison").await.unwrap();

        assert_eq!(handler.calls(), 1);
        assert_eq!(channel.dead_letters().await, vec![b"poison".to_vec()]);
        // Never redelivered to the main queue.
        assert_eq!(channel.pending_count("q").await, 0);
        assert_eq!(handler.calls(), 1);
    }

    #[tokio::test]
    async fn failed_publish_surfaces_not_connected() {
        let channel = InMemoryChannel::new();
        channel.set_fail_publish(true);

        let result = channel.publish("q", b"lost").await;
        assert!(matches!(result, Err(ChannelError::NotConnected)));
        assert_eq!(channel.pending_count("q").await, 0);

        channel.set_fail_publish(false);
        channel.publish("q", b"kept").await.unwrap();
        assert_eq!(channel.pending_count("q").await, 1);
    }

    #[tokio::test]
    async fn queues_are_independent() {
        let channel = InMemoryChannel::new();
        channel.publish("a", b"1").await.unwrap();
        channel.publish("b", b"2").await.unwrap();

        assert_eq!(channel.pending_count("a").await, 1);
        assert_eq!(channel.pending_count("b").await, 1);
    }
}
