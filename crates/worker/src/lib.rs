//! Notification delivery worker.
//!
//! Consumes [`DeliveryMessage`]s from the notification queue one at a time
//! and performs the side-effecting email delivery. Failures are never
//! retried here: a message that cannot be parsed or delivered is rejected
//! without requeue and lands on the dead-letter queue, the sole recovery
//! path. Immediate retries against a down mail transport would amplify load,
//! not fix it.
//!
//! [`DeliveryMessage`]: messaging::DeliveryMessage

pub mod email;
pub mod handler;

pub use email::{DeliveryError, EmailSender, InMemoryEmailSender, SmtpEmailSender};
pub use handler::NotificationWorker;
