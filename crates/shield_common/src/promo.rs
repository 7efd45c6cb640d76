//! Promo code redemption.
//!
//! Codes resolve to a premium day count through the configured table; an
//! unknown code is a plain rejection and never touches the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::entitlement::EntitlementStore;
use crate::error::PromoError;

/// One redeemable code, as configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoCode {
    pub code: String,
    pub days: i64,
    #[serde(default)]
    pub description: String,
}

/// The configured code table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromoBook {
    #[serde(default)]
    pub codes: Vec<PromoCode>,
}

/// What a successful redemption granted.
#[derive(Debug, Clone, Serialize)]
pub struct PromoGrant {
    pub days: i64,
    pub description: String,
    pub premium_until: DateTime<Utc>,
}

impl PromoBook {
    /// Case-insensitive code lookup.
    pub fn lookup(&self, code: &str) -> Option<&PromoCode> {
        self.codes
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code.trim()))
    }

    /// Redeem `code` for `user_id`, granting its day count.
    pub fn redeem(
        &self,
        entitlements: &EntitlementStore,
        user_id: &str,
        code: &str,
    ) -> Result<PromoGrant, PromoError> {
        let promo = self.lookup(code).ok_or(PromoError::UnknownCode)?;
        let premium_until = entitlements.grant(user_id, promo.days)?;
        info!(user_id, code = %promo.code, days = promo.days, "promo code redeemed");
        Ok(PromoGrant {
            days: promo.days,
            description: promo.description.clone(),
            premium_until,
        })
    }
}
