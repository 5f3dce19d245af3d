//! Fire-and-forget audit event publishing.
//!
//! Every component emits [`TrackingEvent`]s through the narrow [`Tracker`]
//! interface so the emitter can be stubbed in tests. Events are write-once
//! and never read back by the core; they feed an observability sink only.

pub mod event;
pub mod tracker;

pub use event::{Severity, TrackingEvent};
pub use tracker::{ChannelTracker, InMemoryTracker, Tracker};
