//! SkillForge Subscription API
//!
//! Subscription and usage-gating microservice.
//!
//! ## REST Endpoints
//!
//! - `GET /api/v1/subscription` - Get user's subscription with usage
//! - `GET /api/v1/subscription/usage` - Usage summary with quotas
//! - `POST /api/v1/subscription/cancel` - Cancel (grace period applies)
//! - `POST /api/v1/access/check` - Gate pre-check for guarded operations
//! - `POST /api/v1/usage/record` - Post-success usage recording
//! - `POST /webhooks/stripe` - Stripe webhook handler
//!
//! ## Background Tasks
//!
//! - Expiry sweep (hourly): demotes subscriptions past their period end
//! - Usage reset (checked daily): clears Free-tier counters when the
//!   calendar month rolls over
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics

mod config;
mod error;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use chrono::{Datelike, Utc};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use skillforge_db::Stores;
use skillforge_subscription_core::SubscriptionSweeper;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::handlers::{health, ready};
use crate::state::{AppState, PgService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("subscription_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting SkillForge Subscription API");

    let config = Config::from_env()?;
    tracing::info!(http_port = config.http_port, "Configuration loaded");

    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    let pool = skillforge_db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    let stores = Stores::new(pool.clone());
    let state = AppState::new(stores, pool, config);

    // Background sweeps run until the server shuts down
    let expiry_task = tokio::spawn(run_expiry_sweep(
        state.subscriptions.clone(),
        state.config.expiry_sweep_interval,
    ));
    let reset_task = tokio::spawn(run_usage_reset(
        state.subscriptions.clone(),
        state.config.reset_check_interval,
    ));

    let app = build_router(state.clone(), metrics_handle);
    let http_addr = SocketAddr::from(([0, 0, 0, 0], state.config.http_port));

    run_http_server(app, http_addr).await?;

    expiry_task.abort();
    reset_task.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    let api_v1 = Router::new()
        .route("/subscription", get(handlers::get_subscription))
        .route("/subscription/usage", get(handlers::get_usage))
        .route("/subscription/cancel", post(handlers::cancel_subscription))
        .route("/access/check", post(handlers::check_access))
        .route("/usage/record", post(handlers::record_usage));

    // Webhook route (separate - uses raw body, no JSON parsing)
    let webhook_routes = Router::new().route("/webhooks/stripe", post(handlers::stripe_webhook));

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(webhook_routes)
        .layer(middleware)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}

async fn run_http_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Hourly pass over subscriptions past their period end. The sweep is
/// idempotent, so an interval firing twice (or a second replica running
/// the same loop) does no harm.
async fn run_expiry_sweep(service: Arc<PgService>, period: std::time::Duration) {
    let sweeper = SubscriptionSweeper::new(service);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        match sweeper.expire_overdue().await {
            Ok(outcome) => {
                metrics::counter!("sweep_expirations_total").increment(outcome.applied as u64);
            }
            Err(e) => {
                tracing::error!(error = %e, "Expiry sweep run failed");
            }
        }
    }
}

/// Daily check for a calendar-month rollover; counters are cleared on
/// the first tick of each new month.
async fn run_usage_reset(service: Arc<PgService>, period: std::time::Duration) {
    let sweeper = SubscriptionSweeper::new(service);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut last_month = Utc::now().month();

    loop {
        interval.tick().await;
        let month = Utc::now().month();
        if month == last_month {
            continue;
        }

        match sweeper.reset_free_tier_usage().await {
            Ok(outcome) => {
                last_month = month;
                metrics::counter!("sweep_usage_resets_total").increment(outcome.applied as u64);
            }
            Err(e) => {
                // Month stays un-advanced; the next tick retries
                tracing::error!(error = %e, "Usage reset sweep run failed");
            }
        }
    }
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Gate checks and usage recording sit on request hot paths; the
    // buckets cover sub-millisecond cache hits up to slow DB calls
    let latency_buckets = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0, 2.5];

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full("subscription_operation_duration_seconds".to_string()),
            latency_buckets,
        )?;

    let handle = builder.install_recorder()?;

    metrics::describe_counter!(
        "subscription_cancellations_total",
        "Total subscriptions cancelled via the API"
    );
    metrics::describe_counter!(
        "access_checks_total",
        "Total access gate checks by result"
    );
    metrics::describe_counter!(
        "usage_recorded_total",
        "Total usage amounts recorded by feature"
    );
    metrics::describe_counter!(
        "webhooks_processed_total",
        "Total webhooks processed by status"
    );
    metrics::describe_counter!(
        "sweep_expirations_total",
        "Total subscriptions demoted by the expiry sweep"
    );
    metrics::describe_counter!(
        "sweep_usage_resets_total",
        "Total Free-tier usage resets applied by the monthly sweep"
    );
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request latency in seconds"
    );
    metrics::describe_histogram!(
        "subscription_operation_duration_seconds",
        "Subscription operation latency in seconds by operation type"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
