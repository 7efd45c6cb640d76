//! Payment event handling.
//!
//! Events arrive already verified by the payment collaborator; this module
//! only resolves them into entitlement changes. Checkout-session creation
//! and signature checks live outside the daemon.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shield_common::{EntitlementStore, StoreError};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventKind {
    /// Subscription activated; grant the configured day count.
    CheckoutCompleted,
    /// Renewal charge bounced; acknowledged, entitlement untouched until
    /// it expires on its own.
    PaymentFailed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    pub user_id: String,
    pub event: PaymentEventKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentAck {
    pub granted: bool,
    pub premium_until: Option<DateTime<Utc>>,
}

/// Apply one verified payment event.
pub fn apply_event(
    entitlements: &EntitlementStore,
    grant_days: i64,
    event: &PaymentEvent,
) -> Result<PaymentAck, StoreError> {
    match event.event {
        PaymentEventKind::CheckoutCompleted => {
            let premium_until = entitlements.grant(&event.user_id, grant_days)?;
            info!(user_id = %event.user_id, until = %premium_until, "checkout completed");
            Ok(PaymentAck {
                granted: true,
                premium_until: Some(premium_until),
            })
        }
        PaymentEventKind::PaymentFailed => {
            warn!(user_id = %event.user_id, "payment failed, entitlement unchanged");
            Ok(PaymentAck {
                granted: false,
                premium_until: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shield_common::MemoryBackend;
    use std::sync::Arc;

    fn entitlements() -> EntitlementStore {
        EntitlementStore::new(Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn checkout_completed_grants_configured_days() {
        let entitlements = entitlements();
        let ack = apply_event(
            &entitlements,
            30,
            &PaymentEvent {
                user_id: "u1".to_string(),
                event: PaymentEventKind::CheckoutCompleted,
            },
        )
        .unwrap();
        assert!(ack.granted);
        assert!(ack.premium_until.is_some());
        assert!(entitlements.is_premium("u1").unwrap());
    }

    #[test]
    fn renewal_stacks_on_existing_entitlement() {
        let entitlements = entitlements();
        let event = PaymentEvent {
            user_id: "u1".to_string(),
            event: PaymentEventKind::CheckoutCompleted,
        };
        let first = apply_event(&entitlements, 30, &event).unwrap();
        let second = apply_event(&entitlements, 30, &event).unwrap();
        let gap = second.premium_until.unwrap() - first.premium_until.unwrap();
        assert_eq!(gap.num_days(), 30);
    }

    #[test]
    fn payment_failed_changes_nothing() {
        let entitlements = entitlements();
        let ack = apply_event(
            &entitlements,
            30,
            &PaymentEvent {
                user_id: "u1".to_string(),
                event: PaymentEventKind::PaymentFailed,
            },
        )
        .unwrap();
        assert!(!ack.granted);
        assert!(!entitlements.is_premium("u1").unwrap());
    }

    #[test]
    fn event_kind_deserializes_from_snake_case() {
        let event: PaymentEvent =
            serde_json::from_str(r#"{"user_id":"u1","event":"checkout_completed"}"#).unwrap();
        assert_eq!(event.event, PaymentEventKind::CheckoutCompleted);
    }
}
