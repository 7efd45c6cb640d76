//! Message and verdict types shared across the decision pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message delivered by the ingress adapter for analysis.
///
/// Constructed at ingress and discarded after processing; the core never
/// persists message text.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub user_id: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Build a message stamped with the current time.
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::at(user_id, text, Utc::now())
    }

    /// Build a message with an explicit arrival time.
    pub fn at(
        user_id: impl Into<String>,
        text: impl Into<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            received_at,
        }
    }
}

/// Risk classification tiers, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Verdict {
    Low,
    Medium,
    High,
}

impl Verdict {
    /// Fixed advice string for this tier.
    pub fn advice(&self) -> &'static str {
        match self {
            Verdict::High => "Do not click or reply. Verify independently through official channels.",
            Verdict::Medium => "Be cautious. Verify the sender and any links before interacting.",
            Verdict::Low => "Appears low risk, but verify any request for money or credentials.",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Low => "Low",
            Verdict::Medium => "Medium",
            Verdict::High => "High",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Output of the rule-based scorer: a 0-100 score plus the reasons that
/// contributed, in detection order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: u8,
    pub flags: Vec<String>,
}

/// Final analysis payload returned to the ingress adapter.
///
/// When `used_fallback` is true the `advice` field carries the external
/// classifier's advisory text and supersedes the rule-based tier for
/// display; `verdict`, `score` and `flags` keep the rule-based values for
/// diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictResult {
    pub verdict: Verdict,
    pub score: u8,
    pub flags: Vec<String>,
    pub advice: String,
    pub used_fallback: bool,
}

/// Outcome of handling one inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The message was analyzed.
    Verdict(VerdictResult),
    /// The user exhausted the daily free quota; no analysis was run.
    QuotaExceeded { daily_limit: u32 },
    /// Nothing to analyze.
    EmptyText,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_ordering() {
        assert!(Verdict::Low < Verdict::Medium);
        assert!(Verdict::Medium < Verdict::High);
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let json = serde_json::to_value(Outcome::QuotaExceeded { daily_limit: 10 }).unwrap();
        assert_eq!(json["outcome"], "quota_exceeded");
        assert_eq!(json["daily_limit"], 10);

        let json = serde_json::to_value(Outcome::EmptyText).unwrap();
        assert_eq!(json["outcome"], "empty_text");
    }
}
