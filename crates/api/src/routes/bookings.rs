//! Booking endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use domain::{Booking, BookingRepository, StudentId, TutorId};
use messaging::MessageChannel;
use saga::services::CORRELATION_HEADER;
use saga::{BookingOrchestrator, BookingRequest, IdentityService, SchedulingService};
use serde::{Deserialize, Serialize};

use crate::correlation::Correlation;
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<R, I, S, C>
where
    R: BookingRepository,
    I: IdentityService,
    S: SchedulingService,
    C: MessageChannel,
{
    pub orchestrator: BookingOrchestrator<R, I, S, C>,
}

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub student_id: String,
    pub tutor_id: String,
    pub subject: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: String,
    pub student_id: String,
    pub tutor_id: String,
    pub subject: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub state: String,
    pub reservation_id: Option<String>,
    pub failure_reason: Option<String>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id.to_string(),
            student_id: booking.student_id.to_string(),
            tutor_id: booking.tutor_id.to_string(),
            subject: booking.subject,
            scheduled_at: booking.scheduled_at,
            duration_minutes: booking.duration_minutes,
            state: booking.state.to_string(),
            reservation_id: booking.reservation_id.map(|id| id.to_string()),
            failure_reason: booking.failure_reason,
        }
    }
}

// -- Handlers --

/// POST /bookings — run the booking saga for one request.
#[tracing::instrument(skip_all)]
pub async fn create<R, I, S, C>(
    State(state): State<Arc<AppState<R, I, S, C>>>,
    Correlation(correlation_id): Correlation,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Response, ApiError>
where
    R: BookingRepository + 'static,
    I: IdentityService + 'static,
    S: SchedulingService + 'static,
    C: MessageChannel + 'static,
{
    if req.duration_minutes == 0 {
        return Err(ApiError::BadRequest(
            "durationMinutes must be positive".to_string(),
        ));
    }

    let request = BookingRequest {
        student_id: StudentId::new(req.student_id),
        tutor_id: TutorId::new(req.tutor_id),
        subject: req.subject,
        scheduled_at: req.scheduled_at,
        duration_minutes: req.duration_minutes,
    };

    let booking = state
        .orchestrator
        .request_booking(request, correlation_id.clone())
        .await?;

    let mut response =
        (StatusCode::CREATED, Json(BookingResponse::from(booking))).into_response();
    if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    Ok(response)
}
