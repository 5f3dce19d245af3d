//! Identity service gateway: trait, HTTP client, breaker wrapper, and
//! in-memory implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::CorrelationId;
use resilience::{CircuitBreaker, CircuitBreakerError};
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::services::CORRELATION_HEADER;

const SERVICE: &str = "identity_service";

/// A user record returned by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub email: String,
}

/// Which identity collection to look a user up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserRole {
    Student,
    Tutor,
}

impl UserRole {
    /// URL path segment for this role.
    pub fn path_segment(&self) -> &'static str {
        match self {
            UserRole::Student => "students",
            UserRole::Tutor => "tutors",
        }
    }
}

/// Unary lookup against the identity service.
///
/// `Ok(None)` means the user does not exist: a normal, successful negative
/// result, distinct from any `RemoteError`.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn find_user(
        &self,
        role: UserRole,
        id: &str,
        correlation_id: &CorrelationId,
    ) -> Result<Option<User>, RemoteError>;
}

/// HTTP client for the identity service.
#[derive(Clone)]
pub struct HttpIdentityService {
    base_url: String,
    http: reqwest::Client,
}

impl HttpIdentityService {
    /// Creates a client for the identity service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn find_user(
        &self,
        role: UserRole,
        id: &str,
        correlation_id: &CorrelationId,
    ) -> Result<Option<User>, RemoteError> {
        let url = format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            role.path_segment(),
            id
        );

        let response = self
            .http
            .get(&url)
            .header(CORRELATION_HEADER, correlation_id.as_str())
            .send()
            .await
            .map_err(|e| connection_error(SERVICE, e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(RemoteError::Status {
                service: SERVICE.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .json::<User>()
            .await
            .map(Some)
            .map_err(|e| RemoteError::InvalidResponse {
                service: SERVICE.to_string(),
                message: e.to_string(),
            })
    }
}

pub(crate) fn connection_error(service: &str, e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout {
            service: service.to_string(),
        }
    } else {
        RemoteError::Connection {
            service: service.to_string(),
            message: e.to_string(),
        }
    }
}

/// Identity gateway routed through a shared circuit breaker.
///
/// The breaker enforces the fixed per-call timeout and rejects calls while
/// open; a not-found result passes through as a success and never counts
/// toward opening the circuit.
pub struct ResilientIdentityService<I> {
    inner: I,
    breaker: Arc<CircuitBreaker>,
}

impl<I> ResilientIdentityService<I> {
    /// Wraps `inner` with the given breaker.
    pub fn new(inner: I, breaker: Arc<CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }
}

#[async_trait]
impl<I: IdentityService> IdentityService for ResilientIdentityService<I> {
    async fn find_user(
        &self,
        role: UserRole,
        id: &str,
        correlation_id: &CorrelationId,
    ) -> Result<Option<User>, RemoteError> {
        match self
            .breaker
            .execute(correlation_id, self.inner.find_user(role, id, correlation_id))
            .await
        {
            Ok(user) => Ok(user),
            Err(CircuitBreakerError::Open { .. }) => Err(RemoteError::CircuitOpen {
                service: SERVICE.to_string(),
            }),
            Err(CircuitBreakerError::Timeout { .. }) => Err(RemoteError::Timeout {
                service: SERVICE.to_string(),
            }),
            Err(CircuitBreakerError::Inner(e)) => Err(e),
        }
    }
}

#[derive(Debug, Default)]
struct InMemoryIdentityState {
    users: HashMap<(UserRole, String), User>,
    fail_on_lookup: bool,
}

/// In-memory identity service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityService {
    state: Arc<RwLock<InMemoryIdentityState>>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryIdentityService {
    /// Creates a new service with no known users.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user under the given role.
    pub fn insert(&self, role: UserRole, user: User) {
        self.state
            .write()
            .unwrap()
            .users
            .insert((role, user.id.clone()), user);
    }

    /// Makes lookups fail with a connection error.
    pub fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().unwrap().fail_on_lookup = fail;
    }

    /// Returns the number of lookups attempted against this service.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn find_user(
        &self,
        role: UserRole,
        id: &str,
        _correlation_id: &CorrelationId,
    ) -> Result<Option<User>, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().unwrap();
        if state.fail_on_lookup {
            return Err(RemoteError::Connection {
                service: SERVICE.to_string(),
                message: "simulated network failure".to_string(),
            });
        }
        Ok(state.users.get(&(role, id.to_string())).cloned())
    }
}
