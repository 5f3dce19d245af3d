//! Booking domain: the entity whose lifecycle the saga orchestrator owns,
//! and the repository boundary behind which the persistence engine lives.

pub mod booking;
pub mod error;
pub mod repository;

pub use booking::{Booking, BookingState, BookingUpdate, NewBooking, ReservationId, StudentId, TutorId};
pub use error::RepositoryError;
pub use repository::{BookingRepository, InMemoryBookingRepository};
