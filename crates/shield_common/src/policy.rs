//! Verdict tiers and the ambiguous-band fallback policy.
//!
//! Tier thresholds are fixed constants, not tunable at runtime. The
//! ambiguous band deliberately extends past the Medium tier up to the High
//! cutoff: scores 16 through 59 are eligible for an external second
//! opinion, everything else is decided by the rules alone.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::classifier::ScamClassifier;
use crate::message::{ScoreResult, Verdict, VerdictResult};

/// Score at or above which a message is High risk.
pub const HIGH_THRESHOLD: u8 = 60;
/// Score at or above which a message is Medium risk.
pub const MEDIUM_THRESHOLD: u8 = 30;
/// Exclusive lower bound of the fallback band.
pub const AMBIGUOUS_LOW: u8 = 15;
/// Exclusive upper bound of the fallback band.
pub const AMBIGUOUS_HIGH: u8 = 60;

/// Map a score to its tier.
pub fn verdict_for(score: u8) -> Verdict {
    if score >= HIGH_THRESHOLD {
        Verdict::High
    } else if score >= MEDIUM_THRESHOLD {
        Verdict::Medium
    } else {
        Verdict::Low
    }
}

/// Whether a score is uncertain enough to warrant the external classifier.
pub fn in_ambiguous_band(score: u8) -> bool {
    score > AMBIGUOUS_LOW && score < AMBIGUOUS_HIGH
}

/// Finalizes a scored message, deferring to the AI classifier inside the
/// ambiguous band and degrading silently when it fails.
pub struct VerdictPolicy {
    classifier: Arc<dyn ScamClassifier>,
}

impl VerdictPolicy {
    pub fn new(classifier: Arc<dyn ScamClassifier>) -> Self {
        Self { classifier }
    }

    /// Decide the final payload for a scored message. The classifier is
    /// consulted at most once and only inside the band; any failure keeps
    /// the rule-based result and is logged as a diagnostic, never surfaced
    /// to the user.
    pub fn decide(&self, scored: ScoreResult, text: &str) -> VerdictResult {
        let verdict = verdict_for(scored.score);
        let mut result = VerdictResult {
            verdict,
            score: scored.score,
            flags: scored.flags,
            advice: verdict.advice().to_string(),
            used_fallback: false,
        };

        if !in_ambiguous_band(result.score) {
            return result;
        }

        match self.classifier.classify(text) {
            Ok(advisory) => {
                debug!(score = result.score, "classifier advisory supersedes rule verdict");
                result.advice = advisory;
                result.used_fallback = true;
            }
            Err(e) => {
                warn!(score = result.score, error = %e,
                      "classifier fallback failed, keeping rule-based verdict");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FakeClassifier;
    use crate::error::ClassifyError;

    fn scored(score: u8) -> ScoreResult {
        ScoreResult {
            score,
            flags: vec!["Suspicious phrase: urgency language".to_string()],
        }
    }

    fn policy_with(fake: FakeClassifier) -> (VerdictPolicy, Arc<FakeClassifier>) {
        let fake = Arc::new(fake);
        (VerdictPolicy::new(fake.clone()), fake)
    }

    #[test]
    fn tier_boundaries_are_exact() {
        assert_eq!(verdict_for(0), Verdict::Low);
        assert_eq!(verdict_for(29), Verdict::Low);
        assert_eq!(verdict_for(30), Verdict::Medium);
        assert_eq!(verdict_for(59), Verdict::Medium);
        assert_eq!(verdict_for(60), Verdict::High);
        assert_eq!(verdict_for(100), Verdict::High);
    }

    #[test]
    fn band_boundaries_are_exclusive() {
        assert!(!in_ambiguous_band(15));
        assert!(in_ambiguous_band(16));
        assert!(in_ambiguous_band(59));
        assert!(!in_ambiguous_band(60));
    }

    #[test]
    fn classifier_is_not_consulted_outside_the_band() {
        let (policy, fake) = policy_with(FakeClassifier::always_text("should not appear"));
        for score in [0, 15, 60, 99] {
            let result = policy.decide(scored(score), "text");
            assert!(!result.used_fallback);
            assert_eq!(result.advice, verdict_for(score).advice());
        }
        assert_eq!(fake.call_count(), 0);
    }

    #[test]
    fn classifier_advisory_supersedes_rule_advice_in_band() {
        let (policy, fake) = policy_with(FakeClassifier::always_text("Likely a prize scam."));
        let result = policy.decide(scored(36), "you won a prize, claim now");
        assert!(result.used_fallback);
        assert_eq!(result.advice, "Likely a prize scam.");
        // Rule-based diagnostics are retained.
        assert_eq!(result.score, 36);
        assert_eq!(result.verdict, Verdict::Medium);
        assert_eq!(fake.call_count(), 1);
    }

    #[test]
    fn classifier_failure_degrades_to_rule_verdict() {
        for error in [
            ClassifyError::NotConfigured,
            ClassifyError::Transport("connection refused".to_string()),
            ClassifyError::Unparseable("garbage".to_string()),
        ] {
            let (policy, fake) = policy_with(FakeClassifier::always_error(error));
            let result = policy.decide(scored(36), "text");
            assert!(!result.used_fallback);
            assert_eq!(result.verdict, Verdict::Medium);
            assert_eq!(result.advice, Verdict::Medium.advice());
            assert_eq!(fake.call_count(), 1);
        }
    }
}
