use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use forecast_core::{ErrorKind, ForecastError, ForecastRequest, ForecastResponse, finish, prepare};
use std::sync::Arc;

use crate::error::HubError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/forecast", post(api_forecast))
}

/// Validate, align, call the model once, derive the signal.
///
/// The readiness check comes first: an uninitialized service does no work
/// at all. Nothing is returned unless every stage succeeds.
pub async fn run_forecast(
    state: &AppState,
    req: ForecastRequest,
    now: DateTime<Utc>,
) -> Result<ForecastResponse, ForecastError> {
    let model = state.model().ok_or(ForecastError::ModelNotReady)?;
    let prepared = prepare(req, &state.config.limits(), now)?;

    let rows = model
        .predict(&prepared.frame, &prepared.params)
        .await
        .map_err(|e| ForecastError::Execution(format!("{e:#}")))?;

    finish(prepared, rows)
}

/// POST /forecast — quantile forecast plus derived trading signal.
async fn api_forecast(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ForecastRequest>, JsonRejection>,
) -> Result<Json<ForecastResponse>, HubError> {
    let Json(req) = body.map_err(|e| HubError::BadRequest(e.body_text()))?;
    let token = req.token.clone().unwrap_or_else(|| "unknown".to_string());

    tracing::info!(
        token = %token,
        candles = req.prices.len(),
        covariates = ?req.covariates.supplied(),
        prediction_length = req.prediction_length,
        "forecast request"
    );

    match run_forecast(&state, req, Utc::now()).await {
        Ok(resp) => {
            tracing::debug!(
                token = %token,
                direction = resp.direction.as_str(),
                confidence = resp.confidence,
                pct_change = resp.pct_change,
                "forecast ok"
            );
            Ok(Json(resp))
        }
        Err(e) => {
            match e.kind() {
                ErrorKind::Validation => tracing::debug!(token = %token, "rejected: {e}"),
                ErrorKind::ModelNotReady => tracing::warn!(token = %token, "model not loaded yet"),
                ErrorKind::Execution => tracing::error!(token = %token, "forecast error: {e}"),
            }
            Err(e.into())
        }
    }
}
