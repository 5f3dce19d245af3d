//! HTTP API server for the booking system.
//!
//! Exposes the booking saga over REST with structured logging (tracing) and
//! Prometheus metrics. Request validation stays at this edge; the saga
//! itself trusts its inputs.

pub mod config;
pub mod correlation;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::BookingRepository;
use messaging::MessageChannel;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{IdentityService, SchedulingService};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::bookings::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R, I, S, C>(
    state: Arc<AppState<R, I, S, C>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    R: BookingRepository + 'static,
    I: IdentityService + 'static,
    S: SchedulingService + 'static,
    C: MessageChannel + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/bookings", post(routes::bookings::create::<R, I, S, C>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
