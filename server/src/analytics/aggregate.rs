//! Snapshot aggregation.

use chrono::{DateTime, Datelike, Utc, Weekday};
use mp_common::{Analytics, Message, SentimentTier, Stat};

/// Ratio at or above which a response counts as satisfied.
pub const SATISFIED_THRESHOLD: f64 = 0.8;

/// Ratio at or above which a response counts as neutral.
pub const NEUTRAL_THRESHOLD: f64 = 0.6;

/// Aggregate delivery, read and response counters plus sentiment over a
/// full message snapshot.
///
/// Result depends only on the set of messages, not their order.
pub fn aggregate(messages: &[Message]) -> Analytics {
    let mut analytics = Analytics::default();

    for message in messages {
        analytics.total.sent += 1;
        day_mut(&mut analytics, message.created_at).sent += 1;

        if let Some(read_at) = message.read_at {
            analytics.total.read += 1;
            day_mut(&mut analytics, read_at).read += 1;
        }

        if let Some(response) = &message.response {
            analytics.total.received_response += 1;
            day_mut(&mut analytics, response.created_at).received_response += 1;

            if let Some(ratio) = response.score.and_then(|s| s.ratio()) {
                analytics.sentiment.record(classify(ratio));
            }
        }
    }

    analytics
}

/// Satisfaction tier of a score ratio.
pub fn classify(ratio: f64) -> SentimentTier {
    if ratio >= SATISFIED_THRESHOLD {
        SentimentTier::Satisfied
    } else if ratio >= NEUTRAL_THRESHOLD {
        SentimentTier::Neutral
    } else {
        SentimentTier::Unsatisfied
    }
}

/// Lowercase English weekday name of a UTC timestamp.
pub const fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

fn day_mut(analytics: &mut Analytics, at: DateTime<Utc>) -> &mut Stat {
    analytics
        .by_day
        .entry(weekday_name(at.weekday()).to_string())
        .or_default()
}
