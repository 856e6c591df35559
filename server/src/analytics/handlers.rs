//! Analytics API Handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use mp_common::Analytics;
use thiserror::Error;
use tracing::instrument;

use super::aggregate::aggregate;
use crate::api::AppState;
use crate::messages::StoreError;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for AnalyticsError {
    fn into_response(self) -> axum::response::Response {
        let Self::Store(err) = &self;
        tracing::error!("Failed to retrieve analytics: {}", err);

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "error": "INTERNAL_ERROR",
                "message": "Failed to retrieve analytics"
            })),
        )
            .into_response()
    }
}

/// GET /api/analytics
#[instrument(skip_all)]
pub async fn get_analytics(State(state): State<AppState>) -> Result<Json<Analytics>, AnalyticsError> {
    let messages = state.store.snapshot().await?;
    Ok(Json(aggregate(&messages)))
}
