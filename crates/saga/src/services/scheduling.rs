//! Scheduling service gateway: trait, HTTP client, and in-memory
//! implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::CorrelationId;
use domain::{ReservationId, StudentId, TutorId};
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::services::CORRELATION_HEADER;
use crate::services::identity::connection_error;

const SERVICE: &str = "scheduling_service";

/// Parameters of a slot reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotReservation {
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub student_id: StudentId,
}

/// Availability, reservation and release operations on the scheduling
/// service. Release is idempotent on the remote side.
#[async_trait]
pub trait SchedulingService: Send + Sync {
    /// Returns whether the tutor is free at the given time.
    async fn check_availability(
        &self,
        tutor_id: &TutorId,
        time: DateTime<Utc>,
        correlation_id: &CorrelationId,
    ) -> Result<bool, RemoteError>;

    /// Places a hold on the tutor's slot, returning its identifier.
    async fn reserve_slot(
        &self,
        tutor_id: &TutorId,
        reservation: SlotReservation,
        correlation_id: &CorrelationId,
    ) -> Result<ReservationId, RemoteError>;

    /// Releases a previously placed hold (the compensating action).
    async fn release_slot(
        &self,
        reservation_id: &ReservationId,
        correlation_id: &CorrelationId,
    ) -> Result<(), RemoteError>;
}

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    available: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReserveResponse {
    reservation_id: String,
}

/// HTTP client for the scheduling service.
#[derive(Clone)]
pub struct HttpSchedulingService {
    base_url: String,
    http: reqwest::Client,
}

impl HttpSchedulingService {
    /// Creates a client for the scheduling service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl SchedulingService for HttpSchedulingService {
    async fn check_availability(
        &self,
        tutor_id: &TutorId,
        time: DateTime<Utc>,
        correlation_id: &CorrelationId,
    ) -> Result<bool, RemoteError> {
        let url = self.url(&format!("tutors/{tutor_id}/availability"));
        let response = self
            .http
            .get(&url)
            .query(&[("time", time.to_rfc3339())])
            .header(CORRELATION_HEADER, correlation_id.as_str())
            .send()
            .await
            .map_err(|e| connection_error(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(RemoteError::Status {
                service: SERVICE.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .json::<AvailabilityResponse>()
            .await
            .map(|r| r.available)
            .map_err(|e| RemoteError::InvalidResponse {
                service: SERVICE.to_string(),
                message: e.to_string(),
            })
    }

    async fn reserve_slot(
        &self,
        tutor_id: &TutorId,
        reservation: SlotReservation,
        correlation_id: &CorrelationId,
    ) -> Result<ReservationId, RemoteError> {
        let url = self.url(&format!("tutors/{tutor_id}/reserve"));
        let response = self
            .http
            .post(&url)
            .json(&reservation)
            .header(CORRELATION_HEADER, correlation_id.as_str())
            .send()
            .await
            .map_err(|e| connection_error(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(RemoteError::Status {
                service: SERVICE.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .json::<ReserveResponse>()
            .await
            .map(|r| ReservationId::new(r.reservation_id))
            .map_err(|e| RemoteError::InvalidResponse {
                service: SERVICE.to_string(),
                message: e.to_string(),
            })
    }

    async fn release_slot(
        &self,
        reservation_id: &ReservationId,
        correlation_id: &CorrelationId,
    ) -> Result<(), RemoteError> {
        let url = self.url(&format!("reservations/{reservation_id}"));
        let response = self
            .http
            .delete(&url)
            .header(CORRELATION_HEADER, correlation_id.as_str())
            .send()
            .await
            .map_err(|e| connection_error(SERVICE, e))?;

        // Release is idempotent: an already-released hold answers 404.
        if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(RemoteError::Status {
                service: SERVICE.to_string(),
                status: response.status().as_u16(),
            })
        }
    }
}

#[derive(Debug, Default)]
struct InMemorySchedulingState {
    unavailable: bool,
    fail_on_availability: bool,
    fail_on_reserve: bool,
    fail_on_release: bool,
    next_id: u32,
    reservations: HashMap<ReservationId, TutorId>,
    released: Vec<ReservationId>,
}

/// In-memory scheduling service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchedulingService {
    state: Arc<RwLock<InMemorySchedulingState>>,
}

impl InMemorySchedulingService {
    /// Creates a new service with every slot available.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the tutor's slots as unavailable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unwrap().unavailable = unavailable;
    }

    /// Makes availability checks fail with a connection error.
    pub fn set_fail_on_availability(&self, fail: bool) {
        self.state.write().unwrap().fail_on_availability = fail;
    }

    /// Makes reserve calls fail with a connection error.
    pub fn set_fail_on_reserve(&self, fail: bool) {
        self.state.write().unwrap().fail_on_reserve = fail;
    }

    /// Makes release calls fail with a connection error.
    pub fn set_fail_on_release(&self, fail: bool) {
        self.state.write().unwrap().fail_on_release = fail;
    }

    /// Returns the number of holds currently placed.
    pub fn reservation_count(&self) -> usize {
        self.state.read().unwrap().reservations.len()
    }

    /// Returns the release calls received, in order.
    pub fn released(&self) -> Vec<ReservationId> {
        self.state.read().unwrap().released.clone()
    }
}

#[async_trait]
impl SchedulingService for InMemorySchedulingService {
    async fn check_availability(
        &self,
        _tutor_id: &TutorId,
        _time: DateTime<Utc>,
        _correlation_id: &CorrelationId,
    ) -> Result<bool, RemoteError> {
        let state = self.state.read().unwrap();
        if state.fail_on_availability {
            return Err(RemoteError::Connection {
                service: SERVICE.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(!state.unavailable)
    }

    async fn reserve_slot(
        &self,
        tutor_id: &TutorId,
        _reservation: SlotReservation,
        _correlation_id: &CorrelationId,
    ) -> Result<ReservationId, RemoteError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_reserve {
            return Err(RemoteError::Connection {
                service: SERVICE.to_string(),
                message: "connection refused".to_string(),
            });
        }

        state.next_id += 1;
        let id = ReservationId::new(format!("RES-{:04}", state.next_id));
        state.reservations.insert(id.clone(), tutor_id.clone());
        Ok(id)
    }

    async fn release_slot(
        &self,
        reservation_id: &ReservationId,
        _correlation_id: &CorrelationId,
    ) -> Result<(), RemoteError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_release {
            return Err(RemoteError::Connection {
                service: SERVICE.to_string(),
                message: "connection refused".to_string(),
            });
        }
        state.reservations.remove(reservation_id);
        state.released.push(reservation_id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid() -> CorrelationId {
        CorrelationId::new("cid-scheduling")
    }

    fn reservation() -> SlotReservation {
        SlotReservation {
            start_time: Utc::now(),
            duration_minutes: 60,
            student_id: StudentId::new("S1"),
        }
    }

    #[tokio::test]
    async fn reserve_and_release_roundtrip() {
        let service = InMemorySchedulingService::new();
        let tutor = TutorId::new("T1");

        assert!(
            service
                .check_availability(&tutor, Utc::now(), &cid())
                .await
                .unwrap()
        );

        let id = service
            .reserve_slot(&tutor, reservation(), &cid())
            .await
            .unwrap();
        assert_eq!(id, ReservationId::new("RES-0001"));
        assert_eq!(service.reservation_count(), 1);

        service.release_slot(&id, &cid()).await.unwrap();
        assert_eq!(service.reservation_count(), 0);
        assert_eq!(service.released(), vec![id]);
    }

    #[tokio::test]
    async fn unavailable_slot_answers_false() {
        let service = InMemorySchedulingService::new();
        service.set_unavailable(true);

        let available = service
            .check_availability(&TutorId::new("T1"), Utc::now(), &cid())
            .await
            .unwrap();
        assert!(!available);
    }

    #[tokio::test]
    async fn reserve_failure_places_no_hold() {
        let service = InMemorySchedulingService::new();
        service.set_fail_on_reserve(true);

        let result = service
            .reserve_slot(&TutorId::new("T1"), reservation(), &cid())
            .await;
        assert!(matches!(result, Err(RemoteError::Connection { .. })));
        assert_eq!(service.reservation_count(), 0);
    }

    #[test]
    fn reservation_wire_format_is_camel_case() {
        let json = serde_json::to_value(reservation()).unwrap();
        assert!(json.get("startTime").is_some());
        assert_eq!(json["durationMinutes"], 60);
        assert_eq!(json["studentId"], "S1");
    }
}
