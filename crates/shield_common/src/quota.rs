//! Per-user daily usage quota.
//!
//! Non-premium users get a fixed number of checks per calendar day (UTC);
//! the counter resets on the first check of a new day. Checking is itself
//! the increment; there is no separate commit step.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::entitlement::EntitlementStore;
use crate::error::StoreError;
use crate::store::KvBackend;

const KEY_PREFIX: &str = "usage/";

const CAS_ATTEMPTS: u32 = 16;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UsageRecord {
    day: NaiveDate,
    count: u32,
}

/// Result of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    /// Premium users bypass the quota and are not counted at all.
    Unlimited,
    /// Within quota; `count` is the number consumed today including this one.
    Allowed { count: u32 },
    /// Over quota; the message was not analyzed.
    Exceeded { count: u32 },
}

impl QuotaDecision {
    pub fn allowed(&self) -> bool {
        !matches!(self, QuotaDecision::Exceeded { .. })
    }

    /// Consumed count, absent for premium users.
    pub fn count(&self) -> Option<u32> {
        match self {
            QuotaDecision::Unlimited => None,
            QuotaDecision::Allowed { count } | QuotaDecision::Exceeded { count } => Some(*count),
        }
    }
}

/// Daily counter keyed by user, stored through the CAS backend.
#[derive(Clone)]
pub struct UsageQuota {
    backend: Arc<dyn KvBackend>,
    entitlements: EntitlementStore,
}

impl UsageQuota {
    pub fn new(backend: Arc<dyn KvBackend>, entitlements: EntitlementStore) -> Self {
        Self {
            backend,
            entitlements,
        }
    }

    fn key(user_id: &str) -> String {
        format!("{KEY_PREFIX}{user_id}")
    }

    fn parse(user_id: &str, raw: Option<&str>, today: NaiveDate) -> UsageRecord {
        match raw {
            Some(s) => serde_json::from_str(s).unwrap_or_else(|e| {
                warn!(user_id, error = %e, "discarding corrupt usage record");
                UsageRecord {
                    day: today,
                    count: 0,
                }
            }),
            None => UsageRecord {
                day: today,
                count: 0,
            },
        }
    }

    /// Gate one message. Must be called exactly once per inbound message.
    pub fn check_and_increment(
        &self,
        user_id: &str,
        today: NaiveDate,
        daily_limit: u32,
    ) -> Result<QuotaDecision, StoreError> {
        if self.entitlements.is_premium(user_id)? {
            return Ok(QuotaDecision::Unlimited);
        }

        let key = Self::key(user_id);
        for _ in 0..CAS_ATTEMPTS {
            let raw = self.backend.get(&key)?;
            let mut record = Self::parse(user_id, raw.as_deref(), today);

            if record.day != today {
                record = UsageRecord {
                    day: today,
                    count: 0,
                };
            }

            let decision = if record.count >= daily_limit {
                QuotaDecision::Exceeded {
                    count: record.count,
                }
            } else {
                record.count += 1;
                QuotaDecision::Allowed {
                    count: record.count,
                }
            };

            let value =
                serde_json::to_string(&record).map_err(|e| StoreError::Database(e.to_string()))?;
            if self.backend.put_if(&key, raw.as_deref(), &value)? {
                return Ok(decision);
            }
        }
        Err(StoreError::Contention(user_id.to_string(), CAS_ATTEMPTS))
    }

    /// Count consumed today, without incrementing. Used by the status
    /// surface only.
    pub fn usage_today(&self, user_id: &str, today: NaiveDate) -> Result<u32, StoreError> {
        let raw = self.backend.get(&Self::key(user_id))?;
        let record = Self::parse(user_id, raw.as_deref(), today);
        if record.day == today {
            Ok(record.count)
        } else {
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;
    use chrono::{Duration, Utc};

    fn quota() -> (UsageQuota, EntitlementStore) {
        let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
        let entitlements = EntitlementStore::new(backend.clone());
        (
            UsageQuota::new(backend, entitlements.clone()),
            entitlements,
        )
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[test]
    fn counts_up_to_the_limit_then_refuses() {
        let (quota, _) = quota();
        for n in 1..=3 {
            let decision = quota.check_and_increment("u1", today(), 3).unwrap();
            assert_eq!(decision, QuotaDecision::Allowed { count: n });
        }
        let decision = quota.check_and_increment("u1", today(), 3).unwrap();
        assert_eq!(decision, QuotaDecision::Exceeded { count: 3 });
        assert!(!decision.allowed());
    }

    #[test]
    fn day_rollover_resets_the_counter() {
        let (quota, _) = quota();
        let yesterday = today() - Duration::days(1);
        for _ in 0..5 {
            quota.check_and_increment("u1", yesterday, 5).unwrap();
        }
        assert_eq!(
            quota.check_and_increment("u1", yesterday, 5).unwrap(),
            QuotaDecision::Exceeded { count: 5 }
        );

        // First check of the new day behaves like a fresh user.
        let decision = quota.check_and_increment("u1", today(), 5).unwrap();
        assert_eq!(decision, QuotaDecision::Allowed { count: 1 });
    }

    #[test]
    fn premium_users_bypass_and_are_not_counted() {
        let (quota, entitlements) = quota();
        // Exhaust the free quota first.
        for _ in 0..2 {
            quota.check_and_increment("u1", today(), 2).unwrap();
        }
        assert!(!quota
            .check_and_increment("u1", today(), 2)
            .unwrap()
            .allowed());

        entitlements.grant("u1", 30).unwrap();
        for _ in 0..10 {
            let decision = quota.check_and_increment("u1", today(), 2).unwrap();
            assert_eq!(decision, QuotaDecision::Unlimited);
            assert_eq!(decision.count(), None);
        }
        // The stored counter did not move while premium.
        assert_eq!(quota.usage_today("u1", today()).unwrap(), 2);
    }

    #[test]
    fn users_are_counted_independently() {
        let (quota, _) = quota();
        quota.check_and_increment("u1", today(), 5).unwrap();
        quota.check_and_increment("u1", today(), 5).unwrap();
        let decision = quota.check_and_increment("u2", today(), 5).unwrap();
        assert_eq!(decision, QuotaDecision::Allowed { count: 1 });
    }

    #[test]
    fn usage_today_reads_without_incrementing() {
        let (quota, _) = quota();
        assert_eq!(quota.usage_today("u1", today()).unwrap(), 0);
        quota.check_and_increment("u1", today(), 5).unwrap();
        assert_eq!(quota.usage_today("u1", today()).unwrap(), 1);
        assert_eq!(quota.usage_today("u1", today()).unwrap(), 1);
        // Yesterday's record reads as zero on a new day.
        assert_eq!(
            quota
                .usage_today("u1", today() + Duration::days(1))
                .unwrap(),
            0
        );
    }

    #[test]
    fn zero_limit_refuses_immediately_but_persists_rollover() {
        let (quota, _) = quota();
        let decision = quota.check_and_increment("u1", today(), 0).unwrap();
        assert_eq!(decision, QuotaDecision::Exceeded { count: 0 });
    }

    #[test]
    fn concurrent_increments_are_never_lost() {
        let (quota, _) = quota();
        let quota = Arc::new(quota);
        let day = today();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let quota = quota.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        // A contended attempt may report Contention; retrying
                        // the whole call is the caller's contract.
                        loop {
                            match quota.check_and_increment("u1", day, 1000) {
                                Ok(_) => break,
                                Err(StoreError::Contention(_, _)) => continue,
                                Err(e) => panic!("unexpected store error: {e}"),
                            }
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(quota.usage_today("u1", day).unwrap(), 100);
    }
}
