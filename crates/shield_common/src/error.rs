//! Error types for ScamShield.

use thiserror::Error;

/// Failures of the key-value persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Concurrent update conflict on {0} after {1} attempts")]
    Contention(String, u32),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Failures of the external AI classifier. All of them degrade to the
/// rule-based verdict; none reach the end user.
#[derive(Error, Debug, Clone)]
pub enum ClassifyError {
    #[error("Classifier is not configured")]
    NotConfigured,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unparseable classifier response: {0}")]
    Unparseable(String),
}

/// Promo redemption failures. An unknown code is a rejection, not a
/// storage problem.
#[derive(Error, Debug)]
pub enum PromoError {
    #[error("Unknown promo code")]
    UnknownCode,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Top-level error for a single message decision.
#[derive(Error, Debug)]
pub enum ShieldError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}
