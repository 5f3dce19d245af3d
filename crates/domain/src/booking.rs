//! Booking entity, its state machine, and value objects.

use chrono::{DateTime, Utc};
use common::BookingId;
use serde::{Deserialize, Serialize};

/// Identifier of a student in the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    /// Creates a student ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StudentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a tutor in the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TutorId(String);

impl TutorId {
    /// Creates a tutor ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TutorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TutorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque slot-hold identifier owned by the scheduling service.
///
/// The orchestrator only carries it between the reserve call that returns it
/// and the release call that needs it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(String);

impl ReservationId {
    /// Wraps a reservation identifier returned by the scheduling service.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ReservationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle state of a booking.
///
/// ```text
/// Pending ──┬──► Confirmed
///           └──► Failed
/// ```
///
/// Transitions are monotonic: once Confirmed or Failed the entity is never
/// reopened. A booking may also be created directly in Failed when the
/// reservation succeeded but the initial Pending persist did not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingState {
    Pending,
    Confirmed,
    Failed,
}

impl BookingState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingState::Confirmed | BookingState::Failed)
    }

    /// Returns true if the entity may move from `self` to `next`.
    pub fn can_transition_to(&self, next: BookingState) -> bool {
        matches!(
            (self, next),
            (BookingState::Pending, BookingState::Confirmed)
                | (BookingState::Pending, BookingState::Failed)
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingState::Pending => "PENDING",
            BookingState::Confirmed => "CONFIRMED",
            BookingState::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for BookingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One tutoring session request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Assigned by the repository on first persist.
    pub id: BookingId,
    pub student_id: StudentId,
    pub tutor_id: TutorId,
    pub subject: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub state: BookingState,
    /// Back-reference to the scheduling service's slot hold, if one was made.
    pub reservation_id: Option<ReservationId>,
    /// Why the booking failed, when it did.
    pub failure_reason: Option<String>,
}

/// A booking about to be persisted for the first time.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub student_id: StudentId,
    pub tutor_id: TutorId,
    pub subject: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub state: BookingState,
    pub reservation_id: Option<ReservationId>,
    pub failure_reason: Option<String>,
}

impl NewBooking {
    /// A booking entering the saga in Pending state.
    pub fn pending(
        student_id: StudentId,
        tutor_id: TutorId,
        subject: impl Into<String>,
        scheduled_at: DateTime<Utc>,
        duration_minutes: u32,
    ) -> Self {
        Self {
            student_id,
            tutor_id,
            subject: subject.into(),
            scheduled_at,
            duration_minutes,
            state: BookingState::Pending,
            reservation_id: None,
            failure_reason: None,
        }
    }
}

/// Partial update applied to a persisted booking.
///
/// Only the fields set to `Some` are written; last write wins per field.
#[derive(Debug, Clone, Default)]
pub struct BookingUpdate {
    pub state: Option<BookingState>,
    pub reservation_id: Option<ReservationId>,
    pub failure_reason: Option<String>,
}

impl BookingUpdate {
    /// An update that only records the reservation back-reference.
    pub fn reservation(reservation_id: ReservationId) -> Self {
        Self {
            reservation_id: Some(reservation_id),
            ..Default::default()
        }
    }

    /// An update that confirms the booking.
    pub fn confirmed() -> Self {
        Self {
            state: Some(BookingState::Confirmed),
            ..Default::default()
        }
    }

    /// An update that fails the booking with a reason.
    pub fn failed(reason: impl Into<String>, reservation_id: Option<ReservationId>) -> Self {
        Self {
            state: Some(BookingState::Failed),
            reservation_id,
            failure_reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_is_not_terminal() {
        assert!(!BookingState::Pending.is_terminal());
        assert!(BookingState::Confirmed.is_terminal());
        assert!(BookingState::Failed.is_terminal());
    }

    #[test]
    fn transitions_are_monotonic() {
        assert!(BookingState::Pending.can_transition_to(BookingState::Confirmed));
        assert!(BookingState::Pending.can_transition_to(BookingState::Failed));

        assert!(!BookingState::Confirmed.can_transition_to(BookingState::Pending));
        assert!(!BookingState::Confirmed.can_transition_to(BookingState::Failed));
        assert!(!BookingState::Failed.can_transition_to(BookingState::Pending));
        assert!(!BookingState::Failed.can_transition_to(BookingState::Confirmed));
    }

    #[test]
    fn state_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&BookingState::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!(
            serde_json::to_string(&BookingState::Confirmed).unwrap(),
            "\"CONFIRMED\""
        );
    }

    #[test]
    fn update_builders_set_expected_fields() {
        let update = BookingUpdate::failed("timed out", Some(ReservationId::new("RES-1")));
        assert_eq!(update.state, Some(BookingState::Failed));
        assert_eq!(update.failure_reason.as_deref(), Some("timed out"));
        assert_eq!(update.reservation_id, Some(ReservationId::new("RES-1")));

        let update = BookingUpdate::confirmed();
        assert_eq!(update.state, Some(BookingState::Confirmed));
        assert!(update.reservation_id.is_none());
        assert!(update.failure_reason.is_none());
    }
}
