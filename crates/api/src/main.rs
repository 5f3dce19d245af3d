//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use api::routes::bookings::AppState;
use messaging::{AmqpChannel, AmqpConfig, MessageChannel, NOTIFICATION_QUEUE, QueueTopology};
use resilience::{CircuitBreaker, CircuitBreakerConfig};
use saga::{BookingOrchestrator, HttpIdentityService, HttpSchedulingService, ResilientIdentityService};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracking::{ChannelTracker, Tracker};
use worker::{NotificationWorker, SmtpEmailSender};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Message channel: connection is established and maintained in the
    // background; publishes before it comes up are best-effort by design.
    let channel = AmqpChannel::new(
        AmqpConfig {
            url: config.amqp_url.clone(),
            ..Default::default()
        },
        QueueTopology::default(),
    );
    let tracker: Arc<dyn Tracker> = Arc::new(ChannelTracker::new(channel.clone()));

    // 4. Notification worker drains the queue independently of the API.
    let smtp = SmtpEmailSender::new(&config.smtp_host, config.smtp_port, &config.smtp_from)
        .expect("invalid SMTP_FROM address");
    let notification_worker = Arc::new(NotificationWorker::new(smtp, tracker.clone()));
    let consumer_channel = channel.clone();
    tokio::spawn(async move {
        if let Err(e) = consumer_channel
            .consume(NOTIFICATION_QUEUE, notification_worker)
            .await
        {
            tracing::error!(error = %e, "notification consumer terminated");
        }
    });

    // 5. Saga orchestrator over the remote gateways.
    let breaker = Arc::new(CircuitBreaker::new(
        "identity_lookup",
        CircuitBreakerConfig::default(),
        tracker.clone(),
    ));
    let identity = ResilientIdentityService::new(
        HttpIdentityService::new(config.identity_service_url.clone()),
        breaker,
    );
    let scheduling = HttpSchedulingService::new(config.scheduling_service_url.clone());
    let repository = domain::InMemoryBookingRepository::new();

    let orchestrator = BookingOrchestrator::new(
        repository,
        identity,
        scheduling,
        channel.clone(),
        tracker,
    );
    let state = Arc::new(AppState { orchestrator });

    // 6. Build and start the server
    let app = api::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
