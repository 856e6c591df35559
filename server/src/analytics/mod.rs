//! Message Analytics
//!
//! Delivery, read and response counters with a per-weekday breakdown and
//! satisfaction sentiment, computed over the full message snapshot.

pub mod aggregate;
pub mod handlers;
pub mod reporter;

use axum::routing::get;
use axum::Router;

pub use aggregate::{aggregate, classify};
pub use reporter::spawn_summary_reporter;

use crate::api::AppState;

/// Analytics routes. The trailing-slash form is served too.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/analytics", get(handlers::get_analytics))
        .route("/api/analytics/", get(handlers::get_analytics))
}
