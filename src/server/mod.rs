//! HTTP surface: webhook ingestion, the admin dashboard API, and the
//! message relay. A thin layer over the processing core.

pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::adapters::JandiClient;
use crate::core::{EventLog, RetryController, RunTracker, StatusProjector, WebhookPipeline};

/// Interval between background sweeps of expired tracker entries.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared handles for all request handlers.
pub struct AppState {
    pub pipeline: WebhookPipeline,
    pub retry: RetryController,
    pub projector: StatusProjector,
    pub log: Arc<dyn EventLog>,
    pub tracker: Arc<RunTracker>,
    pub jandi: Option<JandiClient>,
    pub webhook_token: Option<String>,
}

/// Build the router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/webhook/jandi", post(handlers::receive_webhook))
        .route("/admin/webhooks", get(handlers::webhook_status))
        .route("/admin/retry-ai-summary", post(handlers::retry_ai_summary))
        .route("/logs", get(handlers::recent_logs))
        .route("/send-message", post(handlers::send_message))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve, with a background task evicting expired tracker entries.
pub async fn run(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let tracker = Arc::clone(&state.tracker);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            tracker.sweep_expired();
        }
    });

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "jandi-relay listening");
    axum::serve(listener, app).await?;

    Ok(())
}
