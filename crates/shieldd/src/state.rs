//! Shared application state for HTTP handlers.

use std::sync::Arc;
use std::time::Instant;

use shield_common::classifier;
use shield_common::{
    DecisionOrchestrator, EntitlementStore, KvBackend, PromoBook, ShieldConfig, UsageQuota,
    VerdictPolicy,
};

/// Everything a request handler needs, wired once at startup.
pub struct AppState {
    pub orchestrator: DecisionOrchestrator,
    pub entitlements: EntitlementStore,
    pub quota: UsageQuota,
    pub promo: PromoBook,
    pub daily_limit: u32,
    pub grant_days: i64,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the decision core onto `backend` per `config`.
    pub fn build(config: &ShieldConfig, backend: Arc<dyn KvBackend>) -> Self {
        let entitlements = EntitlementStore::new(backend.clone());
        let quota = UsageQuota::new(backend, entitlements.clone());
        let policy = VerdictPolicy::new(classifier::from_config(&config.classifier));
        let orchestrator =
            DecisionOrchestrator::new(policy, quota.clone(), config.quota.daily_limit);

        Self {
            orchestrator,
            entitlements,
            quota,
            promo: config.promo.clone(),
            daily_limit: config.quota.daily_limit,
            grant_days: config.billing.grant_days,
            start_time: Instant::now(),
        }
    }
}
