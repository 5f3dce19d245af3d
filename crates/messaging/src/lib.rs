//! Publish/consume abstraction over a durable message broker.
//!
//! The channel carries two flows: confirmation notifications published by the
//! booking orchestrator and consumed by the notification worker, and
//! fire-and-forget tracking events. Messages a consumer explicitly rejects
//! are routed by the broker to a catch-all dead-letter queue; that routing is
//! a topology contract, not application logic.

pub mod amqp;
pub mod channel;
pub mod error;
pub mod memory;
pub mod message;
pub mod topology;

pub use amqp::{AmqpChannel, AmqpConfig};
pub use channel::{Disposition, MessageChannel, MessageHandler};
pub use error::ChannelError;
pub use memory::InMemoryChannel;
pub use message::DeliveryMessage;
pub use topology::{
    DEAD_LETTER_EXCHANGE, DEAD_LETTER_QUEUE, NOTIFICATION_QUEUE, QueueTopology, TRACKING_QUEUE,
};
