use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use secrecy::ExposeSecret;
use service_core::error::AppError;
use subtle::ConstantTimeEq;

use crate::dtos::donations::SweepResponse;
use crate::services::donations::sweep;
use crate::AppState;

pub const CRON_TOKEN_HEADER: &str = "x-cron-token";

fn check_cron_token(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let expected = state.config.billing.cron_token.expose_secret();
    if expected.is_empty() {
        return Err(AppError::Unauthorized(
            "Billing sweep is not enabled".to_string(),
        ));
    }

    let presented = headers
        .get(CRON_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing cron token".to_string()))?;

    if bool::from(expected.as_bytes().ct_eq(presented.as_bytes())) {
        Ok(())
    } else {
        tracing::warn!("Billing sweep called with a wrong cron token");
        Err(AppError::Unauthorized("Invalid cron token".to_string()))
    }
}

/// Charges every due subscription. Called by an external scheduler.
pub async fn run_sweep(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SweepResponse>, AppError> {
    check_cron_token(&state, &headers)?;

    let report = sweep(&state.repos, state.payments.as_ref(), Utc::now()).await?;
    Ok(Json(SweepResponse {
        due: report.due,
        charged: report.charged,
        pending: report.pending,
        failed: report.failed,
    }))
}
