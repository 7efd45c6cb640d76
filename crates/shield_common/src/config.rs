//! Configuration management for ScamShield.
//!
//! Loads settings from /etc/scamshield/config.toml or uses defaults; every
//! field has a serde default so a partial file is fine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::classifier::ClassifierConfig;
use crate::promo::PromoBook;

/// Config file path.
pub const CONFIG_PATH: &str = "/etc/scamshield/config.toml";

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    // Localhost only; a reverse proxy owns the public surface.
    "127.0.0.1:7311".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Daily free-tier quota.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
}

fn default_daily_limit() -> u32 {
    10
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "/var/lib/scamshield/shield.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Entitlement defaults for payment events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Days granted per completed checkout.
    #[serde(default = "default_grant_days")]
    pub grant_days: i64,
}

fn default_grant_days() -> i64 {
    30
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            grant_days: default_grant_days(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShieldConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub quota: QuotaConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub billing: BillingConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub promo: PromoBook,
}

impl ShieldConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "config file missing, using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn load_default() -> Result<Self> {
        Self::load(Path::new(CONFIG_PATH))
    }
}
