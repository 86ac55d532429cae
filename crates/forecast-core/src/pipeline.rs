//! Request pipeline, split around the model call.
//!
//! [`prepare`] runs validation, alignment and frame building; the caller
//! sends the frame to the model; [`finish`] decodes the rows, derives the
//! signal and assembles the response. Either half fails atomically.

use chrono::{DateTime, Utc};

use crate::covariate::{Covariate, align_covariates};
use crate::error::ForecastError;
use crate::frame::{ContextFrame, build_context_frame};
use crate::quantile::{QUANTILE_LEVELS, QuantileRow, decode_forecast};
use crate::request::{ForecastRequest, RequestLimits};
use crate::response::{ForecastResponse, assemble_response};
use crate::signal::{SignalContext, derive_signal};

/// Arguments for the model call besides the frame itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictParams {
    pub prediction_length: usize,
    pub quantile_levels: [f64; 3],
}

/// A validated request with its context frame, waiting on the model.
#[derive(Debug, Clone)]
pub struct PreparedForecast {
    pub token: Option<String>,
    pub frame: ContextFrame,
    pub params: PredictParams,
    pub current_price: f64,
    pub covariates_used: Vec<Covariate>,
}

pub fn prepare(
    req: ForecastRequest,
    limits: &RequestLimits,
    now: DateTime<Utc>,
) -> Result<PreparedForecast, ForecastError> {
    crate::validate::validate_request(&req, limits)?;

    let n = req.prices.len();
    let aligned = align_covariates(&req.covariates, n);
    let frame = build_context_frame(
        req.token.as_deref(),
        &req.prices,
        aligned,
        req.candle_minutes,
        now,
    )?;

    let current_price = *req
        .prices
        .last()
        .ok_or_else(|| ForecastError::invalid("prices is empty"))?;

    Ok(PreparedForecast {
        token: req.token,
        covariates_used: frame.covariates_used(),
        params: PredictParams {
            prediction_length: req.prediction_length,
            quantile_levels: QUANTILE_LEVELS,
        },
        current_price,
        frame,
    })
}

pub fn finish(
    prepared: PreparedForecast,
    rows: Vec<QuantileRow>,
) -> Result<ForecastResponse, ForecastError> {
    let forecasts = decode_forecast(rows, prepared.params.prediction_length)?;
    let ctx = SignalContext {
        prediction_length: prepared.params.prediction_length,
        candle_minutes: prepared.frame.candle_minutes(),
        covariates_used: &prepared.covariates_used,
    };
    let signal = derive_signal(&forecasts, prepared.current_price, &ctx)?;

    Ok(assemble_response(
        prepared.token,
        prepared.current_price,
        forecasts,
        signal,
        prepared.covariates_used,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Direction;
    use chrono::{TimeDelta, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 11).unwrap()
    }

    fn prep(req: ForecastRequest) -> Result<PreparedForecast, ForecastError> {
        prepare(req, &RequestLimits::default(), now())
    }

    /// Rows one candle apart after the frame's last timestamp, reversed to
    /// exercise the ordering step.
    fn rows_for(prepared: &PreparedForecast, steps: &[(f64, f64, f64)]) -> Vec<QuantileRow> {
        let last = *prepared.frame.timestamps().last().unwrap();
        let step = TimeDelta::minutes(i64::from(prepared.frame.candle_minutes()));
        let mut rows: Vec<QuantileRow> = steps
            .iter()
            .enumerate()
            .map(|(i, (lo, med, hi))| QuantileRow {
                timestamp: last + step * (i as i32 + 1),
                q10: *lo,
                q50: *med,
                q90: *hi,
            })
            .collect();
        rows.reverse();
        rows
    }

    #[test]
    fn constant_series_is_neutral() {
        let prepared = prep(ForecastRequest::new(vec![1.0; 20])).unwrap();
        let rows = rows_for(&prepared, &[(1.0, 1.0, 1.0); 3]);
        let resp = finish(prepared, rows).unwrap();
        assert_eq!(resp.direction, Direction::Neutral);
        assert!(resp.pct_change.abs() < 1e-9);
        assert!((resp.confidence - 1.0).abs() < 1e-12);
        assert_eq!(resp.forecasts.len(), 3);
        assert!(resp.covariates_used.is_empty());
    }

    #[test]
    fn linear_rise_is_bullish() {
        let prices: Vec<f64> = (0..15).map(|i| 1.0 + 0.01 * i as f64).collect();
        let prepared = prep(ForecastRequest::new(prices)).unwrap();
        assert!((prepared.current_price - 1.14).abs() < 1e-12);
        let rows = rows_for(
            &prepared,
            &[(1.15, 1.16, 1.17), (1.17, 1.18, 1.19), (1.19, 1.20, 1.21)],
        );
        let resp = finish(prepared, rows).unwrap();
        assert_eq!(resp.direction, Direction::Bullish);
        assert!((resp.pct_change - 5.2632).abs() < 1e-3);
        let medians: Vec<f64> = resp.forecasts.iter().map(|f| f.median).collect();
        assert_eq!(medians, vec![1.16, 1.18, 1.20]);
    }

    #[test]
    fn short_history_fails_before_frame_is_built() {
        let err = prep(ForecastRequest::new(vec![1.0; 10])).unwrap_err();
        assert_eq!(err.to_string(), "Need >= 15 price points, got 10");
    }

    #[test]
    fn covariates_used_is_canonical_regardless_of_supply() {
        let mut req = ForecastRequest::new(vec![2.0; 15]);
        req.covariates.buy_pressure = Some(vec![0.4; 3]);
        req.covariates.rsi_history = Some(vec![60.0; 50]);
        req.token = Some("MOG".into());
        let prepared = prep(req).unwrap();
        assert_eq!(
            prepared.covariates_used,
            vec![Covariate::Rsi, Covariate::BuyPressure]
        );
        let rows = rows_for(&prepared, &[(1.9, 2.0, 2.1); 3]);
        let resp = finish(prepared, rows).unwrap();
        assert_eq!(resp.token.as_deref(), Some("MOG"));
        assert!(resp.summary.contains("(covariates: rsi, buy_pressure)"));
    }

    #[test]
    fn wrong_row_count_is_an_execution_error() {
        let prepared = prep(ForecastRequest::new(vec![1.0; 15])).unwrap();
        let rows = rows_for(&prepared, &[(1.0, 1.0, 1.0); 2]);
        let err = finish(prepared, rows).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Execution);
    }
}
