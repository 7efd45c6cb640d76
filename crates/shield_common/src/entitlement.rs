//! Premium entitlement records.
//!
//! Expiry is purely time-based and records are never deleted; a user stops
//! being premium when `premium_until` passes. A renewal extends from the
//! remaining expiry rather than from now, so paying again never discards
//! unused days.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::store::KvBackend;

const KEY_PREFIX: &str = "premium/";

/// Attempts before a compare-and-swap loop reports contention.
const CAS_ATTEMPTS: u32 = 16;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EntitlementRecord {
    #[serde(default)]
    premium: bool,

    /// RFC3339 UTC expiry. Absent or past means not premium.
    #[serde(default)]
    premium_until: Option<String>,
}

/// Per-user premium status, backed by the CAS key-value store.
#[derive(Clone)]
pub struct EntitlementStore {
    backend: Arc<dyn KvBackend>,
}

impl EntitlementStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    fn key(user_id: &str) -> String {
        format!("{KEY_PREFIX}{user_id}")
    }

    /// Raw value plus parsed record. A corrupt stored value is discarded
    /// rather than failing the request.
    fn load(&self, user_id: &str) -> Result<(Option<String>, EntitlementRecord), StoreError> {
        let raw = self.backend.get(&Self::key(user_id))?;
        let record = match raw.as_deref() {
            Some(s) => serde_json::from_str(s).unwrap_or_else(|e| {
                warn!(user_id, error = %e, "discarding corrupt entitlement record");
                EntitlementRecord::default()
            }),
            None => EntitlementRecord::default(),
        };
        Ok((raw, record))
    }

    /// Grant or extend premium by `days`. Returns the new expiry.
    pub fn grant(&self, user_id: &str, days: i64) -> Result<DateTime<Utc>, StoreError> {
        self.grant_at(user_id, days, Utc::now())
    }

    pub fn grant_at(
        &self,
        user_id: &str,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, StoreError> {
        let key = Self::key(user_id);
        for _ in 0..CAS_ATTEMPTS {
            let (raw, record) = self.load(user_id)?;

            // Stack onto remaining time when still premium, else start from now.
            let base = record
                .premium_until
                .as_deref()
                .and_then(parse_expiry)
                .filter(|until| *until > now)
                .unwrap_or(now);
            let until = base + Duration::days(days);

            let updated = EntitlementRecord {
                premium: true,
                premium_until: Some(until.to_rfc3339()),
            };
            let value = serde_json::to_string(&updated)
                .map_err(|e| StoreError::Database(e.to_string()))?;

            if self.backend.put_if(&key, raw.as_deref(), &value)? {
                info!(user_id, days, until = %until, "premium granted");
                return Ok(until);
            }
        }
        Err(StoreError::Contention(user_id.to_string(), CAS_ATTEMPTS))
    }

    /// Whether the user is premium right now.
    pub fn is_premium(&self, user_id: &str) -> Result<bool, StoreError> {
        self.is_premium_at(user_id, Utc::now())
    }

    pub fn is_premium_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let (_, record) = self.load(user_id)?;
        match record.premium_until.as_deref() {
            None => Ok(false),
            Some(s) => match parse_expiry(s) {
                Some(until) => Ok(until > now),
                // An unreadable timestamp must not fail the check; honor
                // the stored flag as a degraded answer.
                None => {
                    warn!(user_id, stored = s, "unparsable premium expiry, honoring premium flag");
                    Ok(record.premium)
                }
            },
        }
    }

    /// Expiry for status display, if one is recorded and readable.
    pub fn premium_until(&self, user_id: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let (_, record) = self.load(user_id)?;
        Ok(record.premium_until.as_deref().and_then(parse_expiry))
    }
}

fn parse_expiry(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
