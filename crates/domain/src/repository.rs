//! Repository boundary and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::BookingId;

use crate::booking::{Booking, BookingState, BookingUpdate, NewBooking};
use crate::error::{RepositoryError, Result};

/// Passive store for bookings with create/update-by-id semantics.
///
/// The persistence engine itself is an external collaborator; the orchestrator
/// only depends on this boundary. Each write is independently committed: the
/// repository gives no transactional guarantee across the multiple writes a
/// saga performs, which is why compensation exists. `update` must be safe to
/// call repeatedly with the same ID (last write wins per provided field).
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Persists a new booking, assigning its ID.
    async fn create(&self, booking: NewBooking) -> Result<Booking>;

    /// Applies a partial update to an existing booking.
    async fn update(&self, id: BookingId, update: BookingUpdate) -> Result<Booking>;

    /// Loads a booking by ID.
    async fn find(&self, id: BookingId) -> Result<Option<Booking>>;
}

#[derive(Debug, Default)]
struct InMemoryState {
    bookings: HashMap<BookingId, Booking>,
    /// Every persisted write in order, for ordering assertions.
    write_log: Vec<(BookingId, BookingState)>,
    fail_on_create: bool,
    fail_on_update: bool,
}

/// In-memory booking repository for tests and broker-less operation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookingRepository {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryBookingRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next create calls fail.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Makes the next update calls fail.
    pub fn set_fail_on_update(&self, fail: bool) {
        self.state.write().unwrap().fail_on_update = fail;
    }

    /// Returns the number of stored bookings.
    pub fn booking_count(&self) -> usize {
        self.state.read().unwrap().bookings.len()
    }

    /// Returns every persisted write as `(id, state at write time)`, in order.
    pub fn write_log(&self) -> Vec<(BookingId, BookingState)> {
        self.state.read().unwrap().write_log.clone()
    }

    /// Returns the state sequence of writes that changed or set a state.
    pub fn state_writes(&self) -> Vec<BookingState> {
        self.state
            .read()
            .unwrap()
            .write_log
            .iter()
            .map(|(_, state)| *state)
            .collect()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn create(&self, booking: NewBooking) -> Result<Booking> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_create {
            return Err(RepositoryError::WriteFailed(
                "simulated create failure".to_string(),
            ));
        }

        let id = BookingId::new();
        let booking = Booking {
            id,
            student_id: booking.student_id,
            tutor_id: booking.tutor_id,
            subject: booking.subject,
            scheduled_at: booking.scheduled_at,
            duration_minutes: booking.duration_minutes,
            state: booking.state,
            reservation_id: booking.reservation_id,
            failure_reason: booking.failure_reason,
        };
        state.bookings.insert(id, booking.clone());
        state.write_log.push((id, booking.state));
        Ok(booking)
    }

    async fn update(&self, id: BookingId, update: BookingUpdate) -> Result<Booking> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_update {
            return Err(RepositoryError::WriteFailed(
                "simulated update failure".to_string(),
            ));
        }

        let booking = state
            .bookings
            .get_mut(&id)
            .ok_or(RepositoryError::BookingNotFound(id))?;

        if let Some(new_state) = update.state {
            booking.state = new_state;
        }
        if let Some(reservation_id) = update.reservation_id {
            booking.reservation_id = Some(reservation_id);
        }
        if let Some(reason) = update.failure_reason {
            booking.failure_reason = Some(reason);
        }

        let snapshot = booking.clone();
        state.write_log.push((id, snapshot.state));
        Ok(snapshot)
    }

    async fn find(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.state.read().unwrap().bookings.get(&id).cloned())
    }
}
