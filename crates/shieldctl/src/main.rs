//! ScamShield control - operator CLI for the decision core.
//!
//! Works directly against the configured store; the daemon does not need
//! to be running.

use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;

use shield_common::config::CONFIG_PATH;
use shield_common::{
    classifier, scorer, DisabledClassifier, EntitlementStore, PromoError, ScamClassifier,
    ShieldConfig, SqliteBackend, UsageQuota, Verdict, VerdictPolicy,
};

#[derive(Parser)]
#[command(name = "shieldctl")]
#[command(about = "ScamShield - scam-risk triage and entitlements", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a pasted message without touching any quota
    Scan {
        /// The message text to analyze
        text: String,

        /// Consult the configured AI classifier in the ambiguous band
        #[arg(long)]
        classify: bool,
    },

    /// Show a user's plan and usage for today
    Status { user_id: String },

    /// Grant premium days to a user
    Grant {
        user_id: String,

        #[arg(long, default_value_t = 30)]
        days: i64,
    },

    /// Redeem a promo code for a user
    Redeem { user_id: String, code: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(CONFIG_PATH));
    let config = ShieldConfig::load(&config_path)?;

    match cli.command {
        Commands::Scan { text, classify } => scan(&config, &text, classify),
        Commands::Status { user_id } => status(&config, &user_id),
        Commands::Grant { user_id, days } => grant(&config, &user_id, days),
        Commands::Redeem { user_id, code } => redeem(&config, &user_id, &code),
    }
}

fn open_backend(config: &ShieldConfig) -> Result<Arc<SqliteBackend>> {
    Ok(Arc::new(SqliteBackend::open_at(&config.storage.db_path)?))
}

fn scan(config: &ShieldConfig, text: &str, classify: bool) -> Result<()> {
    if text.trim().is_empty() {
        bail!("Nothing to analyze, provide message text");
    }

    let classifier: Arc<dyn ScamClassifier> = if classify {
        classifier::from_config(&config.classifier)
    } else {
        Arc::new(DisabledClassifier)
    };
    let policy = VerdictPolicy::new(classifier);
    let result = policy.decide(scorer::score(text), text);

    let label = match result.verdict {
        Verdict::High => result.verdict.label().red().bold().to_string(),
        Verdict::Medium => result.verdict.label().yellow().bold().to_string(),
        Verdict::Low => result.verdict.label().green().bold().to_string(),
    };
    println!("Verdict: {label} (score {}/100)", result.score);
    for flag in &result.flags {
        println!("  • {flag}");
    }
    if result.used_fallback {
        println!("\nAI second opinion:");
    }
    println!("\n{}", result.advice);
    Ok(())
}

fn status(config: &ShieldConfig, user_id: &str) -> Result<()> {
    let backend = open_backend(config)?;
    let entitlements = EntitlementStore::new(backend.clone());
    let quota = UsageQuota::new(backend, entitlements.clone());

    if entitlements.is_premium(user_id)? {
        match entitlements.premium_until(user_id)? {
            Some(until) => println!(
                "{user_id} is {} until {}",
                "premium".green().bold(),
                until.format("%Y-%m-%d %H:%M UTC")
            ),
            None => println!("{user_id} is {}", "premium".green().bold()),
        }
    } else {
        let used = quota.usage_today(user_id, Utc::now().date_naive())?;
        println!(
            "{user_id} is on the free plan: {used}/{} checks used today",
            config.quota.daily_limit
        );
    }
    Ok(())
}

fn grant(config: &ShieldConfig, user_id: &str, days: i64) -> Result<()> {
    let backend = open_backend(config)?;
    let entitlements = EntitlementStore::new(backend);
    let until = entitlements.grant(user_id, days)?;
    println!(
        "Granted {days} premium days to {user_id} (until {})",
        until.format("%Y-%m-%d %H:%M UTC")
    );
    Ok(())
}

fn redeem(config: &ShieldConfig, user_id: &str, code: &str) -> Result<()> {
    let backend = open_backend(config)?;
    let entitlements = EntitlementStore::new(backend);
    match config.promo.redeem(&entitlements, user_id, code) {
        Ok(granted) => {
            println!(
                "Redeemed {}: {} days ({}) until {}",
                code,
                granted.days,
                granted.description,
                granted.premium_until.format("%Y-%m-%d %H:%M UTC")
            );
            Ok(())
        }
        Err(PromoError::UnknownCode) => bail!("Unknown promo code: {code}"),
        Err(PromoError::Store(e)) => Err(e.into()),
    }
}
