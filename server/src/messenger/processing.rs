//! Sub-event Processing
//!
//! Applies classified webhook sub-events to the message store. Handlers
//! return typed errors; the dispatcher decides how failures are reported.

use chrono::{DateTime, Utc};
use mp_common::{MessageResponseScore, ResponseSubmission};
use thiserror::Error;
use tracing::{debug, warn};

use super::events::{Feedback, FeedbackQuestion, Read, SubEvent};
use crate::messages::{MessageStore, StoreError};

/// Range of the five-star satisfaction question.
pub const FEEDBACK_SCORE_RANGE: i32 = 5;

/// Sub-event handler errors.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Watermark {0} is not a valid timestamp")]
    InvalidWatermark(i64),
    #[error("Feedback score {0:?} is not an integer")]
    InvalidScore(String),
    #[error("Feedback contains no answered question")]
    EmptyFeedback,
}

/// What a successfully processed sub-event changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Messages marked as read by a read receipt.
    MarkedRead { updated: u64 },
    /// Response attached to the message with this ID.
    ResponseRecorded { message_id: String },
}

/// Process one sub-event against the store.
pub async fn process(store: &dyn MessageStore, event: SubEvent) -> Result<Outcome, HandlerError> {
    match event {
        SubEvent::Read { sender_id, read } => process_read(store, &sender_id, read).await,
        SubEvent::Feedback { sender_id, feedback } => {
            process_feedback(store, &sender_id, &feedback).await
        }
    }
}

/// Mark every message the sender had received up to the watermark as read.
pub async fn process_read(
    store: &dyn MessageStore,
    sender_id: &str,
    read: Read,
) -> Result<Outcome, HandlerError> {
    let read_at = watermark_to_time(read.watermark)?;
    let updated = store.mark_read(sender_id, read_at).await?;
    debug!(sender_id, %read_at, updated, "Processed read receipt");
    Ok(Outcome::MarkedRead { updated })
}

/// Record the satisfaction score and commentary as the message's response.
///
/// The question ID is the ID of the message that carried the survey.
pub async fn process_feedback(
    store: &dyn MessageStore,
    sender_id: &str,
    feedback: &Feedback,
) -> Result<Outcome, HandlerError> {
    let (question_id, question) = select_question(sender_id, feedback)?;

    let score = parse_score(&question.payload)?;
    let text = question
        .follow_up
        .as_ref()
        .map(|f| f.payload.clone())
        .unwrap_or_default();

    let submission = ResponseSubmission {
        text,
        score: Some(MessageResponseScore {
            value: score,
            range: FEEDBACK_SCORE_RANGE,
        }),
    };
    store.attach_response(question_id, submission).await?;

    debug!(sender_id, message_id = question_id, score, "Recorded feedback response");
    Ok(Outcome::ResponseRecorded {
        message_id: question_id.to_string(),
    })
}

/// Pick the answered question: the first screen's question with the
/// smallest ID. Extra screens and questions are ignored.
fn select_question<'a>(
    sender_id: &str,
    feedback: &'a Feedback,
) -> Result<(&'a str, &'a FeedbackQuestion), HandlerError> {
    let screen = feedback
        .feedback_screens
        .first()
        .ok_or(HandlerError::EmptyFeedback)?;

    let (id, question) = screen
        .questions
        .iter()
        .next()
        .ok_or(HandlerError::EmptyFeedback)?;

    if feedback.feedback_screens.len() > 1 || screen.questions.len() > 1 {
        warn!(
            sender_id,
            selected = %id,
            screens = feedback.feedback_screens.len(),
            questions = screen.questions.len(),
            "Feedback has more than one question, using the first"
        );
    }

    Ok((id.as_str(), question))
}

fn parse_score(payload: &str) -> Result<i32, HandlerError> {
    payload
        .trim()
        .parse()
        .map_err(|_| HandlerError::InvalidScore(payload.to_string()))
}

fn watermark_to_time(watermark: i64) -> Result<DateTime<Utc>, HandlerError> {
    DateTime::from_timestamp_millis(watermark).ok_or(HandlerError::InvalidWatermark(watermark))
}
