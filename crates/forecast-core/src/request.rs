use serde::{Deserialize, Serialize};

use crate::covariate::CovariateInputs;

pub const DEFAULT_PREDICTION_LENGTH: usize = 3;
pub const DEFAULT_CANDLE_MINUTES: u32 = 5;

/// `POST /forecast` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    /// Close price per candle, most recent last.
    pub prices: Vec<f64>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(flatten)]
    pub covariates: CovariateInputs,
    /// Candles ahead to forecast.
    #[serde(default = "default_prediction_length")]
    pub prediction_length: usize,
    /// Candle duration, used to space the synthetic timestamps.
    #[serde(default = "default_candle_minutes")]
    pub candle_minutes: u32,
}

fn default_prediction_length() -> usize {
    DEFAULT_PREDICTION_LENGTH
}

fn default_candle_minutes() -> u32 {
    DEFAULT_CANDLE_MINUTES
}

impl ForecastRequest {
    pub fn new(prices: Vec<f64>) -> Self {
        Self {
            prices,
            token: None,
            covariates: CovariateInputs::default(),
            prediction_length: DEFAULT_PREDICTION_LENGTH,
            candle_minutes: DEFAULT_CANDLE_MINUTES,
        }
    }
}

/// Service-side bounds applied on top of the fixed minimum history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimits {
    pub max_prediction_length: usize,
    pub max_candle_minutes: u32,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_prediction_length: 64,
            max_candle_minutes: 1440,
        }
    }
}
