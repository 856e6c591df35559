//! Messenger Channel Integration
//!
//! Webhook verification and receipt with HMAC signing, asynchronous
//! dispatch of read receipts and feedback, and outbound survey delivery.

pub mod dispatch;
pub mod events;
pub mod handlers;
pub mod processing;
pub mod send;
pub mod signing;
pub mod types;

use axum::routing::{get, post};
use axum::Router;

pub use dispatch::{DispatchConfig, DispatchReport, DispatchStatsSnapshot, Dispatcher};
pub use send::ChannelClient;

use crate::api::AppState;

/// Messenger routes, nested under `/api/messaging`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/receive/fbmessenger",
            get(handlers::verify).post(handlers::receive),
        )
        .route("/send/fbmessenger", post(handlers::send_message))
}
