//! Saga progress checkpoint.

use common::BookingId;
use domain::ReservationId;

/// What the saga has durably done so far.
///
/// Threaded through the workflow and updated at well-defined checkpoints;
/// read only by the compensation path to decide what needs undoing.
#[derive(Debug, Clone, Default)]
pub struct SagaState {
    booking_id: Option<BookingId>,
    reservation_id: Option<ReservationId>,
}

impl SagaState {
    /// Records the persisted booking, the compensation anchor.
    pub fn record_booking(&mut self, id: BookingId) {
        self.booking_id = Some(id);
    }

    /// Records the slot reservation obtained from the scheduling service.
    pub fn record_reservation(&mut self, id: ReservationId) {
        self.reservation_id = Some(id);
    }

    /// Returns the persisted booking ID, if step 3 completed.
    pub fn booking_id(&self) -> Option<BookingId> {
        self.booking_id
    }

    /// Returns the captured reservation ID, if the reserve call succeeded.
    pub fn reservation_id(&self) -> Option<&ReservationId> {
        self.reservation_id.as_ref()
    }

    /// Returns true once any durable side effect exists, i.e. failures from
    /// here on require compensation.
    pub fn has_durable_side_effects(&self) -> bool {
        self.booking_id.is_some() || self.reservation_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_has_nothing_to_compensate() {
        let state = SagaState::default();
        assert!(state.booking_id().is_none());
        assert!(state.reservation_id().is_none());
        assert!(!state.has_durable_side_effects());
    }

    #[test]
    fn checkpoints_accumulate() {
        let mut state = SagaState::default();

        state.record_booking(BookingId::new());
        assert!(state.has_durable_side_effects());
        assert!(state.reservation_id().is_none());

        state.record_reservation(ReservationId::new("RES-1"));
        assert_eq!(state.reservation_id(), Some(&ReservationId::new("RES-1")));
    }
}
