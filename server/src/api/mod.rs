//! API Router and Application State
//!
//! Central routing configuration and shared state.

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    analytics,
    config::Config,
    messages::MessageStore,
    messenger::{self, ChannelClient, DispatchStatsSnapshot, Dispatcher},
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Message persistence
    pub store: Arc<dyn MessageStore>,
    /// Server configuration
    pub config: Arc<Config>,
    /// Queue for webhook sub-events
    pub dispatcher: Dispatcher,
    /// Channel send client
    pub channel: ChannelClient,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        store: Arc<dyn MessageStore>,
        config: Config,
        dispatcher: Dispatcher,
        channel: ChannelClient,
    ) -> Self {
        Self {
            store,
            config: Arc::new(config),
            dispatcher,
            channel,
        }
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_body_size = state.config.max_body_size;

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Channel webhooks and send
        .nest("/api/messaging", messenger::router())
        // Dashboard analytics
        .merge(analytics::router())
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(max_body_size))
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Message store backend
    store: &'static str,
    /// Sub-event dispatch counters
    dispatch: DispatchStatsSnapshot,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        store: state.store.backend(),
        dispatch: state.dispatcher.stats(),
    })
}
