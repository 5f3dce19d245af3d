//! Saga orchestrator for booking requests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::CorrelationId;
use domain::{Booking, BookingRepository, BookingUpdate, NewBooking, StudentId, TutorId};
use messaging::{DeliveryMessage, MessageChannel, NOTIFICATION_QUEUE};
use serde::Deserialize;
use tracking::{Tracker, TrackingEvent};

use crate::error::BookingError;
use crate::services::identity::{IdentityService, UserRole};
use crate::services::scheduling::{SchedulingService, SlotReservation};
use crate::state::SagaState;

/// Service label stamped on every tracking event the orchestrator emits.
pub const SERVICE_NAME: &str = "booking_service";

/// An inbound request for a tutoring session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub student_id: StudentId,
    pub tutor_id: TutorId,
    pub subject: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
}

/// Orchestrates the booking workflow across the identity service, the
/// scheduling service, the repository, and the message channel.
///
/// Each call to [`request_booking`] runs one saga instance to completion,
/// sequentially within itself, concurrently with other instances. The
/// orchestrator exclusively owns the Booking's state transitions.
///
/// [`request_booking`]: BookingOrchestrator::request_booking
pub struct BookingOrchestrator<R, I, S, C>
where
    R: BookingRepository,
    I: IdentityService,
    S: SchedulingService,
    C: MessageChannel,
{
    repository: R,
    identity: I,
    scheduling: S,
    channel: C,
    tracker: Arc<dyn Tracker>,
}

impl<R, I, S, C> BookingOrchestrator<R, I, S, C>
where
    R: BookingRepository,
    I: IdentityService,
    S: SchedulingService,
    C: MessageChannel,
{
    /// Creates a new orchestrator.
    pub fn new(repository: R, identity: I, scheduling: S, channel: C, tracker: Arc<dyn Tracker>) -> Self {
        Self {
            repository,
            identity,
            scheduling,
            channel,
            tracker,
        }
    }

    /// Runs the booking saga for one request.
    ///
    /// On success the returned Booking is CONFIRMED. On failure after durable
    /// side effects exist, compensation runs first (release the reserved
    /// slot, persist the Booking as FAILED) and the original cause comes back
    /// wrapped in [`BookingError::SagaFailed`]. Failures before any durable
    /// side effect propagate directly.
    ///
    /// Not idempotent across retries: retrying the same logical request
    /// creates a new Booking and a new reservation attempt.
    #[tracing::instrument(skip(self, request), fields(correlation_id = %correlation_id))]
    pub async fn request_booking(
        &self,
        request: BookingRequest,
        correlation_id: CorrelationId,
    ) -> Result<Booking, BookingError> {
        metrics::counter!("booking_saga_executions_total").increment(1);
        let saga_start = std::time::Instant::now();

        let mut saga = SagaState::default();
        let outcome = match self.run(&request, &correlation_id, &mut saga).await {
            Ok(booking) => {
                metrics::counter!("bookings_confirmed_total").increment(1);
                tracing::info!(booking_id = %booking.id, "booking confirmed");
                Ok(booking)
            }
            Err(error) if saga.has_durable_side_effects() => {
                metrics::counter!("bookings_failed_total").increment(1);
                Err(self.compensate(&request, &correlation_id, &saga, error).await)
            }
            Err(error) => {
                // Nothing durable happened; the error propagates untouched.
                metrics::counter!("bookings_failed_total").increment(1);
                self.track_error(&correlation_id, format!("ERROR: {error}"))
                    .await;
                Err(error)
            }
        };

        metrics::histogram!("booking_saga_duration_seconds")
            .record(saga_start.elapsed().as_secs_f64());
        outcome
    }

    /// The forward path. Strict sequential order: later steps never execute
    /// before earlier ones succeed. `saga` is checkpointed after each durable
    /// side effect so the compensation path knows what to undo.
    async fn run(
        &self,
        request: &BookingRequest,
        correlation_id: &CorrelationId,
        saga: &mut SagaState,
    ) -> Result<Booking, BookingError> {
        // 1. Resolve both participants concurrently.
        self.track(correlation_id, "validating booking participants")
            .await;
        let (student, tutor) = tokio::join!(
            self.identity.find_user(
                UserRole::Student,
                request.student_id.as_str(),
                correlation_id
            ),
            self.identity
                .find_user(UserRole::Tutor, request.tutor_id.as_str(), correlation_id),
        );
        let student = student?.ok_or_else(|| {
            BookingError::NotFound(format!("student {} not found", request.student_id))
        })?;
        let tutor = tutor?.ok_or_else(|| {
            BookingError::NotFound(format!("tutor {} not found", request.tutor_id))
        })?;
        self.track(correlation_id, "participants validated").await;

        // 2. Check availability.
        self.track(correlation_id, "checking tutor availability")
            .await;
        let available = self
            .scheduling
            .check_availability(&request.tutor_id, request.scheduled_at, correlation_id)
            .await?;
        if !available {
            return Err(BookingError::Conflict(format!(
                "tutor {} is not available at {}",
                request.tutor_id, request.scheduled_at
            )));
        }
        self.track(correlation_id, "availability confirmed").await;

        // 3. Persist PENDING. This is the first durable side effect and the
        // compensation anchor.
        let booking = self
            .repository
            .create(NewBooking::pending(
                request.student_id.clone(),
                request.tutor_id.clone(),
                request.subject.clone(),
                request.scheduled_at,
                request.duration_minutes,
            ))
            .await?;
        saga.record_booking(booking.id);
        self.track(
            correlation_id,
            format!("pending booking saved (id: {})", booking.id),
        )
        .await;

        // 4. Reserve the slot.
        self.track(correlation_id, "reserving slot").await;
        let reservation_id = self
            .scheduling
            .reserve_slot(
                &request.tutor_id,
                SlotReservation {
                    start_time: request.scheduled_at,
                    duration_minutes: request.duration_minutes,
                    student_id: request.student_id.clone(),
                },
                correlation_id,
            )
            .await?;
        saga.record_reservation(reservation_id.clone());
        self.track(
            correlation_id,
            format!("slot reserved (reservation: {reservation_id})"),
        )
        .await;

        // Record the back-reference on the booking. Best-effort: a failure
        // here is tracked but does not fail the saga.
        if let Err(e) = self
            .repository
            .update(booking.id, BookingUpdate::reservation(reservation_id))
            .await
        {
            self.track_error(
                correlation_id,
                format!("failed to record reservation id on booking: {e}"),
            )
            .await;
        }

        // 5. Publish the confirmation notification. Delivery is decoupled and
        // asynchronous; a publish failure is tracked but never fails the saga.
        let message = DeliveryMessage {
            recipient: student.email.clone(),
            subject: format!("{} session confirmed", request.subject),
            body: format!(
                "Hi {}, your {} session with {} on {} is confirmed.",
                student.full_name, request.subject, tutor.full_name, request.scheduled_at
            ),
            correlation_id: correlation_id.clone(),
        };
        match message.to_bytes() {
            Ok(payload) => match self.channel.publish(NOTIFICATION_QUEUE, &payload).await {
                Ok(()) => {
                    self.track(correlation_id, "notification event published")
                        .await;
                }
                Err(e) => {
                    self.track_error(
                        correlation_id,
                        format!("failed to publish notification event: {e}"),
                    )
                    .await;
                }
            },
            Err(e) => {
                self.track_error(
                    correlation_id,
                    format!("failed to serialize notification event: {e}"),
                )
                .await;
            }
        }

        // 6. Confirm.
        let booking = self
            .repository
            .update(booking.id, BookingUpdate::confirmed())
            .await?;
        self.track(correlation_id, "booking confirmed").await;

        Ok(booking)
    }

    /// The compensation path. Releases the reserved slot if one was captured
    /// and persists the Booking as FAILED with the original cause, creating
    /// the row if the PENDING persist never happened. Durability of the
    /// failure record takes priority over successful cleanup: every
    /// compensation failure is tracked as a critical event, and the original
    /// error is always the one re-raised.
    async fn compensate(
        &self,
        request: &BookingRequest,
        correlation_id: &CorrelationId,
        saga: &SagaState,
        cause: BookingError,
    ) -> BookingError {
        tracing::warn!(error = %cause, "booking saga failed, compensating");
        self.track_error(correlation_id, format!("ERROR: {cause}"))
            .await;

        if let Some(reservation_id) = saga.reservation_id() {
            self.track_error(correlation_id, "compensation: releasing reserved slot")
                .await;
            match self
                .scheduling
                .release_slot(reservation_id, correlation_id)
                .await
            {
                Ok(()) => {
                    self.track_error(correlation_id, "compensation: slot released")
                        .await;
                }
                Err(e) => {
                    // The slot remains held and needs out-of-band attention.
                    self.track_error(
                        correlation_id,
                        format!("CRITICAL: failed to release reservation {reservation_id}: {e}"),
                    )
                    .await;
                }
            }
        }

        let reason = cause.to_string();
        let persisted = match saga.booking_id() {
            Some(id) => self
                .repository
                .update(
                    id,
                    BookingUpdate::failed(&reason, saga.reservation_id().cloned()),
                )
                .await
                .map(drop),
            None if saga.reservation_id().is_some() => {
                // The reservation exists but the PENDING persist never
                // happened: record the outcome as a booking created directly
                // in FAILED.
                self.track_error(correlation_id, "creating FAILED booking record")
                    .await;
                self.repository
                    .create(NewBooking {
                        student_id: request.student_id.clone(),
                        tutor_id: request.tutor_id.clone(),
                        subject: request.subject.clone(),
                        scheduled_at: request.scheduled_at,
                        duration_minutes: request.duration_minutes,
                        state: domain::BookingState::Failed,
                        reservation_id: saga.reservation_id().cloned(),
                        failure_reason: Some(reason.clone()),
                    })
                    .await
                    .map(drop)
            }
            None => Ok(()),
        };

        match persisted {
            Ok(()) => {
                self.track_error(correlation_id, "booking marked FAILED")
                    .await;
            }
            Err(e) => {
                // Losing the FAILED write means losing the saga's outcome.
                self.track_error(
                    correlation_id,
                    format!("CRITICAL: failed to persist FAILED booking: {e}"),
                )
                .await;
            }
        }

        BookingError::saga_failed(cause)
    }

    async fn track(&self, correlation_id: &CorrelationId, message: impl Into<String>) {
        self.tracker
            .emit(TrackingEvent::info(SERVICE_NAME, correlation_id, message))
            .await;
    }

    async fn track_error(&self, correlation_id: &CorrelationId, message: impl Into<String>) {
        self.tracker
            .emit(TrackingEvent::error(SERVICE_NAME, correlation_id, message))
            .await;
    }
}
