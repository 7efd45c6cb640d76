//! ScamShield daemon - analyzes pasted messages for scam risk and gates
//! access by daily quota and premium entitlement.

use anyhow::{Context, Result};
use shield_common::config::CONFIG_PATH;
use shield_common::{ShieldConfig, SqliteBackend};
use shieldd::server;
use shieldd::state::AppState;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("shieldd v{} starting", env!("CARGO_PKG_VERSION"));

    let config_path =
        std::env::var("SHIELDD_CONFIG").unwrap_or_else(|_| CONFIG_PATH.to_string());
    let config = ShieldConfig::load(Path::new(&config_path))?;

    let db_path = Path::new(&config.storage.db_path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let backend = Arc::new(SqliteBackend::open_at(db_path)?);

    let state = AppState::build(&config, backend);
    info!(
        daily_limit = config.quota.daily_limit,
        promo_codes = config.promo.codes.len(),
        "decision core ready"
    );

    server::run(&config.server.bind, state).await
}
