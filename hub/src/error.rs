use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use forecast_core::{ErrorKind, ForecastError};
use serde_json::json;

/// Unified error type for hub API responses.
///
/// Every variant maps to a stable `error` code. Forecast execution failures
/// carry their raw detail for server-side logging only; clients get a fixed
/// message.
#[derive(Debug)]
pub enum HubError {
    BadRequest(String),
    ModelNotReady,
    Forecast(String),
    Unauthorized,
}

impl HubError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "validation_error",
            Self::ModelNotReady => "model_not_ready",
            Self::Forecast(_) => "forecast_failed",
            Self::Unauthorized => "unauthorized",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ModelNotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::Forecast(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl std::fmt::Display for HubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "bad_request: {msg}"),
            Self::ModelNotReady => write!(f, "model_not_ready"),
            Self::Forecast(msg) => write!(f, "forecast_failed: {msg}"),
            Self::Unauthorized => write!(f, "unauthorized"),
        }
    }
}

impl std::error::Error for HubError {}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::BadRequest(msg) => msg.clone(),
            Self::ModelNotReady => "Model not loaded yet".to_string(),
            Self::Forecast(_) => "Forecast failed; see server logs".to_string(),
            Self::Unauthorized => "unauthorized".to_string(),
        };

        let body = json!({ "error": self.code(), "message": message });
        (self.status(), axum::Json(body)).into_response()
    }
}

impl From<ForecastError> for HubError {
    fn from(e: ForecastError) -> Self {
        match e.kind() {
            ErrorKind::Validation => Self::BadRequest(e.to_string()),
            ErrorKind::ModelNotReady => Self::ModelNotReady,
            ErrorKind::Execution => Self::Forecast(e.to_string()),
        }
    }
}
