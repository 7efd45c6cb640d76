//! API routes for shieldd.
//!
//! The decision core is synchronous; handlers run it on the blocking pool
//! so classifier calls and SQLite writes never stall the async runtime.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use shield_common::{InboundMessage, Outcome, PromoError, PromoGrant, StoreError};

use crate::payments::{self, PaymentAck, PaymentEvent};
use crate::state::AppState;

type AppStateArc = Arc<AppState>;

/// Run a synchronous core call off the async runtime, mapping failures to
/// an opaque 500.
async fn run_blocking<T, E, F>(f: F) -> Result<T, (StatusCode, String)>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            error!("request failed: {e}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
        Err(e) => {
            error!("blocking task failed: {e}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

// ============================================================================
// Analyze Routes
// ============================================================================

pub fn analyze_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/analyze", post(analyze))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub user_id: String,
    pub text: String,
}

async fn analyze(
    State(state): State<AppStateArc>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<Outcome>, (StatusCode, String)> {
    let message = InboundMessage::new(req.user_id, req.text);
    let outcome = run_blocking(move || state.orchestrator.handle(&message)).await?;
    Ok(Json(outcome))
}

// ============================================================================
// Account Routes
// ============================================================================

pub fn account_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/status/:user_id", get(status))
        .route("/v1/payments/events", post(payment_event))
        .route("/v1/promo/redeem", post(redeem))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub user_id: String,
    pub premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
    pub used_today: u32,
    pub daily_limit: u32,
}

async fn status(
    State(state): State<AppStateArc>,
    Path(user_id): Path<String>,
) -> Result<Json<StatusResponse>, (StatusCode, String)> {
    let daily_limit = state.daily_limit;
    let response = run_blocking(move || -> Result<StatusResponse, StoreError> {
        let premium = state.entitlements.is_premium(&user_id)?;
        let premium_until = state.entitlements.premium_until(&user_id)?;
        let used_today = state.quota.usage_today(&user_id, Utc::now().date_naive())?;
        Ok(StatusResponse {
            user_id,
            premium,
            premium_until,
            used_today,
            daily_limit,
        })
    })
    .await?;
    Ok(Json(response))
}

async fn payment_event(
    State(state): State<AppStateArc>,
    Json(event): Json<PaymentEvent>,
) -> Result<Json<PaymentAck>, (StatusCode, String)> {
    let ack = run_blocking(move || {
        payments::apply_event(&state.entitlements, state.grant_days, &event)
    })
    .await?;
    Ok(Json(ack))
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub user_id: String,
    pub code: String,
}

async fn redeem(
    State(state): State<AppStateArc>,
    Json(req): Json<RedeemRequest>,
) -> Result<Json<PromoGrant>, (StatusCode, String)> {
    let result = tokio::task::spawn_blocking(move || {
        state
            .promo
            .redeem(&state.entitlements, &req.user_id, &req.code)
    })
    .await
    .map_err(|e| {
        error!("blocking task failed: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    match result {
        Ok(grant) => Ok(Json(grant)),
        Err(PromoError::UnknownCode) => {
            Err((StatusCode::NOT_FOUND, "Unknown promo code".to_string()))
        }
        Err(PromoError::Store(e)) => {
            error!("promo redemption failed: {e}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/healthz", get(healthz))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

async fn healthz(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
