use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::config::HubConfig;
use crate::model::{ForecastModel, ModelSidecarClient, SidecarModel};

/// Shared application state, passed to all route handlers via `axum::extract::State`.
///
/// The model slot starts empty (`Uninitialized`) and is filled exactly once
/// by the startup loader (`Ready`). There is no way back.
pub struct AppState {
    pub config: HubConfig,
    pub sidecar: Arc<ModelSidecarClient>,
    model: OnceLock<Arc<dyn ForecastModel>>,
}

impl AppState {
    pub fn new(config: HubConfig) -> Arc<Self> {
        let sidecar = Arc::new(ModelSidecarClient::new(config.model_sock.clone()));
        Arc::new(Self {
            config,
            sidecar,
            model: OnceLock::new(),
        })
    }

    /// The loaded model, or `None` while still uninitialized.
    pub fn model(&self) -> Option<Arc<dyn ForecastModel>> {
        self.model.get().cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.model.get().is_some()
    }

    /// Transition to `Ready`. Returns `false` if a model was already installed.
    pub fn mark_ready(&self, model: Arc<dyn ForecastModel>) -> bool {
        self.model.set(model).is_ok()
    }
}

/// Ask the sidecar for the configured model until it answers, then install
/// it. Waits `model_load_retry_ms` between attempts. Returns the attempt count.
pub async fn load_model_until_ready(state: &AppState) -> u64 {
    let cfg = &state.config;
    let retry = Duration::from_millis(cfg.model_load_retry_ms);
    tracing::info!(
        "Loading {} on {} via {}",
        cfg.model_id,
        cfg.model_device,
        cfg.model_sock.display()
    );

    let mut attempt = 0u64;
    loop {
        attempt += 1;
        match state.sidecar.load_model(&cfg.model_id, &cfg.model_device).await {
            Ok(loaded) => {
                tracing::info!(
                    attempt,
                    device = loaded.device.as_deref().unwrap_or(cfg.model_device.as_str()),
                    "{} ready",
                    loaded.model
                );
                let model = SidecarModel::new(Arc::clone(&state.sidecar), loaded);
                if !state.mark_ready(Arc::new(model)) {
                    tracing::warn!("model already installed; keeping the first one");
                }
                return attempt;
            }
            Err(e) => {
                tracing::warn!(attempt, "Model load failed: {e:#}");
                tokio::time::sleep(retry).await;
            }
        }
    }
}
