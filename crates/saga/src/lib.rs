//! Booking saga orchestration.
//!
//! [`BookingOrchestrator`] drives the booking workflow across the identity
//! service, the scheduling service, the repository, and the message channel:
//!
//! 1. Resolve student and tutor (concurrently, circuit-breaker guarded)
//! 2. Check tutor availability
//! 3. Persist the booking as PENDING
//! 4. Reserve the slot
//! 5. Publish the confirmation notification (best-effort)
//! 6. Confirm the booking
//!
//! Any failure once durable side effects exist triggers compensation: the
//! reserved slot is released (if one was captured) and the booking is
//! persisted as FAILED with the original cause before the error is re-raised.

pub mod coordinator;
pub mod error;
pub mod services;
pub mod state;

pub use coordinator::{BookingOrchestrator, BookingRequest, SERVICE_NAME};
pub use error::{BookingError, FailureClass, RemoteError};
pub use services::identity::{
    HttpIdentityService, IdentityService, InMemoryIdentityService, ResilientIdentityService, User,
    UserRole,
};
pub use services::scheduling::{
    HttpSchedulingService, InMemorySchedulingService, SchedulingService, SlotReservation,
};
pub use state::SagaState;
