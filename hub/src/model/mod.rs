//! The external forecasting model, seen from the hub.

pub mod sidecar;

use async_trait::async_trait;
use forecast_core::{ContextFrame, PredictParams, QuantileRow};

pub use sidecar::{ModelSidecarClient, SidecarModel};

/// A loaded forecasting model.
///
/// Implementations must tolerate concurrent calls, serializing internally if
/// the underlying runtime is not reentrant. Rows may come back in any order.
#[async_trait]
pub trait ForecastModel: Send + Sync {
    fn model_id(&self) -> &str;

    async fn predict(
        &self,
        frame: &ContextFrame,
        params: &PredictParams,
    ) -> anyhow::Result<Vec<QuantileRow>>;
}
