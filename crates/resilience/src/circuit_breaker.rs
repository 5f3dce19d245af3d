//! Circuit breaker state machine.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use common::CorrelationId;
use thiserror::Error;
use tracking::{Tracker, TrackingEvent};

/// The state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through; outcomes feed the rolling window.
    Closed,
    /// Calls are rejected immediately without touching the network.
    Open,
    /// One probe call is allowed through to test the dependency.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Tuning knobs for the breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of most recent call outcomes considered.
    pub window_size: usize,
    /// Failure rate over the window at which the circuit opens.
    pub failure_rate_threshold: f64,
    /// Minimum number of windowed calls before the rate is evaluated.
    pub minimum_volume: usize,
    /// How long the circuit stays open before admitting a probe.
    pub cooldown: Duration,
    /// Fixed timeout applied to every wrapped call.
    pub call_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            failure_rate_threshold: 0.5,
            minimum_volume: 4,
            cooldown: Duration::from_secs(30),
            call_timeout: Duration::from_millis(1500),
        }
    }
}

/// Errors produced by a guarded call.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; the call was rejected without a network attempt.
    #[error("circuit breaker '{name}' is open, call rejected")]
    Open { name: String },

    /// The call exceeded the fixed per-call timeout.
    #[error("call through circuit breaker '{name}' timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    /// The wrapped call itself failed.
    #[error("{0}")]
    Inner(E),
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    /// Rolling window of recent outcomes, `true` = success.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    from: CircuitState,
    to: CircuitState,
}

enum Admission {
    Allow { probe: bool },
    Reject,
}

/// A circuit breaker guarding one outbound call type.
///
/// Shared across all callers of that call type within a process; constructed
/// once and passed by reference to call sites. State is mutated under an
/// internal lock that is never held across an await point.
///
/// A call returning `Ok` is a success for circuit purposes whatever the
/// payload; in particular a successful negative lookup (`Ok(None)`) never
/// counts toward opening the circuit. Timeouts and call errors count as
/// failures.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
    tracker: Arc<dyn Tracker>,
}

impl CircuitBreaker {
    /// Creates a breaker with the given name and configuration.
    pub fn new(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        tracker: Arc<dyn Tracker>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                window: VecDeque::new(),
                opened_at: None,
                probe_in_flight: false,
            }),
            tracker,
        }
    }

    /// Returns the current circuit state.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    /// Runs `call` through the breaker, applying the fixed call timeout.
    pub async fn execute<T, E, F>(
        &self,
        correlation_id: &CorrelationId,
        call: F,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        let (admission, transition) = self.admit();
        if let Some(transition) = transition {
            self.note_transition(correlation_id, transition).await;
        }

        let probe = match admission {
            Admission::Allow { probe } => probe,
            Admission::Reject => {
                metrics::counter!("circuit_breaker_rejected_total").increment(1);
                return Err(CircuitBreakerError::Open {
                    name: self.name.clone(),
                });
            }
        };

        let (success, result) = match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(Ok(value)) => (true, Ok(value)),
            Ok(Err(e)) => (false, Err(CircuitBreakerError::Inner(e))),
            Err(_) => (
                false,
                Err(CircuitBreakerError::Timeout {
                    name: self.name.clone(),
                    timeout: self.config.call_timeout,
                }),
            ),
        };

        if let Some(transition) = self.record(success, probe) {
            self.note_transition(correlation_id, transition).await;
        }

        result
    }

    fn admit(&self) -> (Admission, Option<Transition>) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => (Admission::Allow { probe: false }, None),
            CircuitState::Open => {
                let cooled_down = inner
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.cooldown);
                if cooled_down {
                    inner.state = CircuitState::HalfOpen;
                    inner.opened_at = None;
                    inner.probe_in_flight = true;
                    (
                        Admission::Allow { probe: true },
                        Some(Transition {
                            from: CircuitState::Open,
                            to: CircuitState::HalfOpen,
                        }),
                    )
                } else {
                    (Admission::Reject, None)
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    (Admission::Reject, None)
                } else {
                    inner.probe_in_flight = true;
                    (Admission::Allow { probe: true }, None)
                }
            }
        }
    }

    fn record(&self, success: bool, probe: bool) -> Option<Transition> {
        let mut inner = self.inner.lock().unwrap();

        if probe {
            inner.probe_in_flight = false;
            return if success {
                inner.state = CircuitState::Closed;
                inner.window.clear();
                Some(Transition {
                    from: CircuitState::HalfOpen,
                    to: CircuitState::Closed,
                })
            } else {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                Some(Transition {
                    from: CircuitState::HalfOpen,
                    to: CircuitState::Open,
                })
            };
        }

        // The circuit may have opened while this call was in flight; its
        // outcome no longer belongs to a CLOSED window.
        if inner.state != CircuitState::Closed {
            return None;
        }

        inner.window.push_back(success);
        while inner.window.len() > self.config.window_size {
            inner.window.pop_front();
        }

        let volume = inner.window.len();
        let failures = inner.window.iter().filter(|ok| !**ok).count();
        if volume >= self.config.minimum_volume
            && failures as f64 / volume as f64 >= self.config.failure_rate_threshold
        {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            inner.window.clear();
            return Some(Transition {
                from: CircuitState::Closed,
                to: CircuitState::Open,
            });
        }

        None
    }

    async fn note_transition(&self, correlation_id: &CorrelationId, transition: Transition) {
        metrics::counter!("circuit_breaker_transitions_total").increment(1);
        tracing::info!(
            breaker = self.name,
            from = %transition.from,
            to = %transition.to,
            "circuit breaker state changed"
        );

        let message = format!(
            "circuit breaker '{}' transitioned {} -> {}",
            self.name, transition.from, transition.to
        );
        let event = if transition.to == CircuitState::Open {
            TrackingEvent::error(self.name.clone(), correlation_id, message)
        } else {
            TrackingEvent::info(self.name.clone(), correlation_id, message)
        };
        self.tracker.emit(event).await;
    }
}
