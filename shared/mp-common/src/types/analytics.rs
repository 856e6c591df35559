//! Analytics Types
//!
//! Wire shape of the analytics summary consumed by the dashboard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Delivery counters for a set of messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub sent: u64,
    pub read: u64,
    #[serde(rename = "replied")]
    pub received_response: u64,
}

/// Satisfaction tier of a scored response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentTier {
    Satisfied,
    Neutral,
    Unsatisfied,
}

/// Count of scored responses per satisfaction tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentiment {
    pub satisfied: u64,
    pub neutral: u64,
    #[serde(rename = "unSatisified")]
    pub unsatisfied: u64,
}

impl Sentiment {
    /// Count one response in the given tier.
    pub fn record(&mut self, tier: SentimentTier) {
        match tier {
            SentimentTier::Satisfied => self.satisfied += 1,
            SentimentTier::Neutral => self.neutral += 1,
            SentimentTier::Unsatisfied => self.unsatisfied += 1,
        }
    }

    /// Total number of classified responses.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.satisfied + self.neutral + self.unsatisfied
    }
}

/// Aggregated analytics over every stored message.
///
/// `by_day` is keyed by lowercase weekday name and is sparse: a day with no
/// activity has no entry, so readers must treat a missing day as all zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytics {
    pub total: Stat,
    #[serde(rename = "byDay")]
    pub by_day: BTreeMap<String, Stat>,
    pub sentiment: Sentiment,
}

impl Analytics {
    /// Stats for a weekday, treating an absent bucket as zero.
    #[must_use]
    pub fn day(&self, weekday: &str) -> Stat {
        self.by_day.get(weekday).copied().unwrap_or_default()
    }
}
