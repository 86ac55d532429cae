use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Quantile levels requested from the model: bear case, base case, bull case.
pub const QUANTILE_LEVELS: [f64; 3] = [0.1, 0.5, 0.9];

/// Forecast for one future candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantileForecast {
    pub low: f64,
    pub median: f64,
    pub high: f64,
}

/// Raw prediction row as returned by the model, in whatever order it chose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantileRow {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "0.1")]
    pub q10: f64,
    #[serde(rename = "0.5")]
    pub q50: f64,
    #[serde(rename = "0.9")]
    pub q90: f64,
}

/// Order model rows by time and check them into per-step forecasts.
///
/// The model must return exactly `prediction_length` rows with finite,
/// monotone quantiles; anything else is an execution failure.
pub fn decode_forecast(
    mut rows: Vec<QuantileRow>,
    prediction_length: usize,
) -> Result<Vec<QuantileForecast>, ForecastError> {
    if rows.len() != prediction_length {
        return Err(ForecastError::execution(format!(
            "model returned {} rows, expected {prediction_length}",
            rows.len()
        )));
    }

    rows.sort_by_key(|r| r.timestamp);

    rows.into_iter()
        .enumerate()
        .map(|(step, r)| {
            if !(r.q10.is_finite() && r.q50.is_finite() && r.q90.is_finite()) {
                return Err(ForecastError::execution(format!(
                    "non-finite quantile at step {step}"
                )));
            }
            if r.q10 > r.q50 || r.q50 > r.q90 {
                return Err(ForecastError::execution(format!(
                    "quantiles out of order at step {step}: low={} median={} high={}",
                    r.q10, r.q50, r.q90
                )));
            }
            Ok(QuantileForecast {
                low: r.q10,
                median: r.q50,
                high: r.q90,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(minute: u32, low: f64, median: f64, high: f64) -> QuantileRow {
        QuantileRow {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, minute, 0).unwrap(),
            q10: low,
            q50: median,
            q90: high,
        }
    }

    #[test]
    fn rows_are_sorted_by_timestamp() {
        let rows = vec![
            row(15, 1.19, 1.20, 1.21),
            row(5, 1.15, 1.16, 1.17),
            row(10, 1.17, 1.18, 1.19),
        ];
        let out = decode_forecast(rows, 3).unwrap();
        let medians: Vec<f64> = out.iter().map(|f| f.median).collect();
        assert_eq!(medians, vec![1.16, 1.18, 1.20]);
    }

    #[test]
    fn row_count_must_match_prediction_length() {
        let err = decode_forecast(vec![row(5, 1.0, 1.0, 1.0)], 3).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Execution);
        assert!(err.to_string().contains("expected 3"));
    }

    #[test]
    fn crossed_quantiles_are_rejected() {
        let err = decode_forecast(vec![row(5, 1.2, 1.1, 1.3)], 1).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Execution);
    }

    #[test]
    fn non_finite_quantiles_are_rejected() {
        assert!(decode_forecast(vec![row(5, f64::NAN, 1.0, 1.1)], 1).is_err());
        assert!(decode_forecast(vec![row(5, 0.9, 1.0, f64::INFINITY)], 1).is_err());
    }

    #[test]
    fn degenerate_equal_quantiles_are_accepted() {
        let out = decode_forecast(vec![row(5, 1.0, 1.0, 1.0)], 1).unwrap();
        assert_eq!(
            out,
            vec![QuantileForecast {
                low: 1.0,
                median: 1.0,
                high: 1.0
            }]
        );
    }

    #[test]
    fn row_decodes_from_model_column_names() {
        let raw = r#"{"item_id":"PEPE","timestamp":"2025-01-01T00:05:00Z","mean":1.1,"0.1":1.0,"0.5":1.1,"0.9":1.2}"#;
        let r: QuantileRow = serde_json::from_str(raw).unwrap();
        assert!((r.q10 - 1.0).abs() < 1e-12);
        assert!((r.q50 - 1.1).abs() < 1e-12);
        assert!((r.q90 - 1.2).abs() < 1e-12);
    }
}
