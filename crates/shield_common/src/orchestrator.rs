//! Per-message decision flow: quota gate, then scorer, then policy.

use tracing::info;

use crate::error::ShieldError;
use crate::message::{InboundMessage, Outcome};
use crate::policy::VerdictPolicy;
use crate::quota::{QuotaDecision, UsageQuota};
use crate::scorer;

/// Composes the quota gate, scorer and verdict policy for one message.
///
/// Storage failures propagate as errors for the request; guessing quota or
/// entitlement state would silently grant bypass.
pub struct DecisionOrchestrator {
    policy: VerdictPolicy,
    quota: UsageQuota,
    daily_limit: u32,
}

impl DecisionOrchestrator {
    pub fn new(policy: VerdictPolicy, quota: UsageQuota, daily_limit: u32) -> Self {
        Self {
            policy,
            quota,
            daily_limit,
        }
    }

    pub fn handle(&self, message: &InboundMessage) -> Result<Outcome, ShieldError> {
        if message.text.trim().is_empty() {
            return Ok(Outcome::EmptyText);
        }

        let today = message.received_at.date_naive();
        let decision = self
            .quota
            .check_and_increment(&message.user_id, today, self.daily_limit)?;
        if let QuotaDecision::Exceeded { count } = decision {
            info!(user_id = %message.user_id, count, "daily quota exhausted");
            return Ok(Outcome::QuotaExceeded {
                daily_limit: self.daily_limit,
            });
        }

        let scored = scorer::score(&message.text);
        let result = self.policy.decide(scored, &message.text);
        info!(
            user_id = %message.user_id,
            verdict = %result.verdict,
            score = result.score,
            used_fallback = result.used_fallback,
            "message analyzed"
        );
        Ok(Outcome::Verdict(result))
    }
}
