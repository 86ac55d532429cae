use std::env;
use std::path::PathBuf;

use forecast_core::RequestLimits;

/// Hub configuration derived from environment variables.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub bind: String,
    pub port: u16,
    /// Bearer token for API auth.  Empty ⇒ auth disabled.
    pub token: String,

    // ── Model sidecar ──────────────────────────────────────────────
    pub model_sock: PathBuf,
    pub model_id: String,
    pub model_device: String,
    pub model_load_retry_ms: u64,

    // ── Request bounds ─────────────────────────────────────────────
    pub max_prediction_length: usize,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn default_sock_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_RUNTIME_DIR") {
        let xdg = xdg.trim();
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join("forecast-model.sock");
        }
    }
    PathBuf::from("/tmp/forecast-model.sock")
}

impl HubConfig {
    pub fn from_env() -> Self {
        let model_sock = env::var("FORECAST_MODEL_SOCK")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_sock_path);

        Self {
            bind: env_str("FORECAST_HUB_BIND", "0.0.0.0"),
            port: env_u16("FORECAST_HUB_PORT", 8000),
            token: env_str("FORECAST_HUB_TOKEN", ""),
            model_sock,
            model_id: env_str("FORECAST_MODEL_ID", "autogluon/chronos-2-small"),
            model_device: env_str("FORECAST_MODEL_DEVICE", "cpu"),
            model_load_retry_ms: env_u64("FORECAST_MODEL_LOAD_RETRY_MS", 2000).max(100),
            max_prediction_length: env_usize("FORECAST_MAX_PREDICTION_LENGTH", 64).max(1),
        }
    }

    /// Request bounds enforced before any model call.
    pub fn limits(&self) -> RequestLimits {
        RequestLimits {
            max_prediction_length: self.max_prediction_length,
            ..RequestLimits::default()
        }
    }
}
