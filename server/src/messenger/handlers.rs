//! Messenger API Handlers
//!
//! Webhook verification, webhook receive and survey send.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use mp_common::{Channel, NewMessage};
use tracing::{debug, info, instrument, warn};

use super::signing::{self, SignatureError, SIGNATURE_HEADER};
use super::types::{MessengerError, SendMessageRequest, SendMessageResponse, VerifyParams};
use super::{events, send};
use crate::api::AppState;

/// Acknowledgment body of an accepted webhook.
pub const EVENT_RECEIVED: &str = "EVENT_RECEIVED";

/// GET /api/messaging/receive/fbmessenger
///
/// Echo the challenge when the channel presents the verify token.
#[instrument(skip_all)]
pub async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Result<String, MessengerError> {
    if !params.is_valid(&state.config.verify_token) {
        warn!(mode = %params.mode, "Webhook verification rejected");
        return Err(MessengerError::VerificationFailed);
    }

    info!("Webhook verified");
    Ok(params.challenge)
}

/// POST /api/messaging/receive/fbmessenger
///
/// Authenticates and parses the payload, then hands its events to the
/// dispatcher. Responds before any event is processed.
#[instrument(skip_all)]
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, MessengerError> {
    let signature = match headers.get(SIGNATURE_HEADER) {
        Some(value) => value
            .to_str()
            .map_err(|_| SignatureError::MalformedSignature)?,
        None => "",
    };

    if let Err(e) = signing::verify_signature(&state.config.app_secret, &body, signature) {
        warn!(error = %e, "Rejected webhook signature");
        return Err(e.into());
    }

    let events = events::parse_events(&body).inspect_err(|e| {
        warn!(error = %e, "Rejected webhook payload");
    })?;

    let report = state.dispatcher.dispatch(events);
    debug!(
        accepted = report.accepted,
        ignored = report.ignored,
        dropped = report.dropped,
        "Webhook events dispatched"
    );

    Ok(EVENT_RECEIVED)
}

/// POST /api/messaging/send/fbmessenger
///
/// Send a customer feedback survey; the message is stored only once the
/// channel accepted it.
#[instrument(skip_all)]
pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<SendMessageResponse>, MessengerError> {
    let Json(request) = payload.map_err(|e| MessengerError::InvalidRequest(e.body_text()))?;
    request.check()?;

    let id = state.store.new_identifier();
    let outbound = send::customer_feedback_request(&id.to_string(), &request.recipient_id);
    state.channel.send(&outbound).await?;

    state
        .store
        .create(NewMessage {
            id,
            channel: Channel::FbMessenger,
            recipient_id: request.recipient_id,
            template_type: request.template_type,
            body: outbound.message,
        })
        .await?;

    info!(message_id = %id, recipient_id = %outbound.recipient.id, "Customer feedback survey sent");
    Ok(Json(SendMessageResponse { id: id.to_string() }))
}
