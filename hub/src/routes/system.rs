use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::state::AppState;

/// Build system sub-router.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

/// GET /health — model load state; no forecasting involved.
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let model = state.model();
    let model_id = model
        .as_ref()
        .map(|m| m.model_id().to_string())
        .unwrap_or_else(|| state.config.model_id.clone());

    Json(json!({
        "status": "ok",
        "model": model_id,
        "model_loaded": state.is_ready(),
    }))
}
