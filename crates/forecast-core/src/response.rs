use serde::{Deserialize, Serialize};

use crate::covariate::Covariate;
use crate::quantile::QuantileForecast;
use crate::signal::{Direction, Signal, round_to};

/// `POST /forecast` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub token: Option<String>,
    pub current_price: f64,
    pub forecasts: Vec<QuantileForecast>,
    pub direction: Direction,
    pub confidence: f64,
    /// Median change vs current price, in percent.
    pub pct_change: f64,
    pub covariates_used: Vec<Covariate>,
    pub summary: String,
}

pub fn assemble_response(
    token: Option<String>,
    current_price: f64,
    forecasts: Vec<QuantileForecast>,
    signal: Signal,
    covariates_used: Vec<Covariate>,
) -> ForecastResponse {
    ForecastResponse {
        token,
        current_price,
        forecasts,
        direction: signal.direction,
        confidence: signal.confidence,
        pct_change: round_to(signal.pct_change * 100.0, 4),
        covariates_used,
        summary: signal.summary,
    }
}
