//! Tracker trait and implementations.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use messaging::{MessageChannel, TRACKING_QUEUE};

use crate::event::{Severity, TrackingEvent};

/// Narrow interface for emitting audit events.
///
/// Emission is fire-and-forget: it never fails from the caller's point of
/// view, and implementations must not block the workflow on sink problems.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Emits one audit event.
    async fn emit(&self, event: TrackingEvent);
}

/// Tracker that records events in memory, for assertions in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTracker {
    events: Arc<RwLock<Vec<TrackingEvent>>>,
}

impl InMemoryTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events in emission order.
    pub fn events(&self) -> Vec<TrackingEvent> {
        self.events.read().unwrap().clone()
    }

    /// Returns the recorded messages in emission order.
    pub fn messages(&self) -> Vec<String> {
        self.events
            .read()
            .unwrap()
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }

    /// Returns the messages of all ERROR-level events.
    pub fn error_messages(&self) -> Vec<String> {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.severity == Severity::Error)
            .map(|e| e.message.clone())
            .collect()
    }

    /// Returns true if any recorded message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.events
            .read()
            .unwrap()
            .iter()
            .any(|e| e.message.contains(needle))
    }
}

#[async_trait]
impl Tracker for InMemoryTracker {
    async fn emit(&self, event: TrackingEvent) {
        self.events.write().unwrap().push(event);
    }
}

/// Tracker that publishes events to the tracking queue.
///
/// Publish failures are logged and swallowed; losing an audit event must
/// never affect the workflow that emitted it.
#[derive(Clone)]
pub struct ChannelTracker<C: MessageChannel> {
    channel: C,
}

impl<C: MessageChannel> ChannelTracker<C> {
    /// Creates a tracker publishing through the given channel.
    pub fn new(channel: C) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl<C: MessageChannel> Tracker for ChannelTracker<C> {
    async fn emit(&self, event: TrackingEvent) {
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize tracking event");
                return;
            }
        };

        if let Err(e) = self.channel.publish(TRACKING_QUEUE, &payload).await {
            tracing::warn!(
                error = %e,
                correlation_id = %event.correlation_id,
                "failed to publish tracking event"
            );
        }
    }
}
