//! Failure isolation for outbound remote calls.
//!
//! A [`CircuitBreaker`] wraps one outbound call shape and stops calling a
//! dependency that keeps failing, rejecting calls locally for a cooldown
//! period before probing it again. Per-call-type state lives in memory and
//! resets on process restart.

pub mod circuit_breaker;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState,
};
