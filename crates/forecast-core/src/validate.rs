use crate::covariate::Covariate;
use crate::error::ForecastError;
use crate::request::{ForecastRequest, RequestLimits};

/// Shortest price history the model accepts as context.
pub const MIN_PRICE_POINTS: usize = 15;

/// Check the price series: enough points, every one finite and positive.
pub fn validate_prices(prices: &[f64]) -> Result<(), ForecastError> {
    if prices.len() < MIN_PRICE_POINTS {
        return Err(ForecastError::InsufficientHistory {
            required: MIN_PRICE_POINTS,
            actual: prices.len(),
        });
    }
    if let Some((i, p)) = prices
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p <= 0.0)
    {
        return Err(ForecastError::invalid(format!(
            "prices[{i}] must be a finite positive number, got {p}"
        )));
    }
    Ok(())
}

fn validate_covariate(covariate: Covariate, values: &[f64]) -> Result<(), ForecastError> {
    if values.is_empty() {
        return Err(ForecastError::invalid(format!(
            "{covariate} history must contain at least 1 value"
        )));
    }
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return Err(ForecastError::invalid(format!(
            "{covariate} history[{i}] must be finite"
        )));
    }
    Ok(())
}

/// Full request check. Prices first, so a short history always reports as such.
pub fn validate_request(req: &ForecastRequest, limits: &RequestLimits) -> Result<(), ForecastError> {
    validate_prices(&req.prices)?;

    if req.prediction_length == 0 || req.prediction_length > limits.max_prediction_length {
        return Err(ForecastError::invalid(format!(
            "prediction_length must be between 1 and {}, got {}",
            limits.max_prediction_length, req.prediction_length
        )));
    }
    if req.candle_minutes == 0 || req.candle_minutes > limits.max_candle_minutes {
        return Err(ForecastError::invalid(format!(
            "candle_minutes must be between 1 and {}, got {}",
            limits.max_candle_minutes, req.candle_minutes
        )));
    }

    for covariate in Covariate::ALL {
        if let Some(values) = req.covariates.get(covariate) {
            validate_covariate(covariate, values)?;
        }
    }
    Ok(())
}
