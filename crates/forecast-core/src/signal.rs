//! Forecast-to-signal derivation.
//!
//! Turns per-step quantiles into a direction bucket, a bounded confidence
//! score and a one-line summary. Comparisons use the fractional change;
//! only the response scales it to percent.

use serde::{Deserialize, Serialize};

use crate::covariate::Covariate;
use crate::error::ForecastError;
use crate::quantile::QuantileForecast;

/// Fractional change beyond which the median forecast counts as a move.
pub const DIRECTION_THRESHOLD: f64 = 0.01;

/// Lower bound on the price used to normalise quantile spreads.
const MIN_SPREAD_DENOM: f64 = 1e-12;

/// Significant digits used for prices in the summary line.
const SUMMARY_PRICE_DIGITS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    /// Bucket a fractional change. Both thresholds are strict.
    pub fn from_pct_change(pct_change: f64) -> Self {
        if pct_change > DIRECTION_THRESHOLD {
            Direction::Bullish
        } else if pct_change < -DIRECTION_THRESHOLD {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Bullish => "bullish",
            Direction::Bearish => "bearish",
            Direction::Neutral => "neutral",
        }
    }
}

/// Request facts the summary line needs.
#[derive(Debug, Clone, Copy)]
pub struct SignalContext<'a> {
    pub prediction_length: usize,
    pub candle_minutes: u32,
    pub covariates_used: &'a [Covariate],
}

/// Derived trading signal. `pct_change` is fractional.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub pct_change: f64,
    pub direction: Direction,
    pub confidence: f64,
    pub summary: String,
}

/// Round to `places` decimals. Rounds the exact binary value, not the
/// scaled product `value * 10^places`.
pub(crate) fn round_to(value: f64, places: usize) -> f64 {
    format!("{value:.places$}").parse().unwrap_or(value)
}

pub fn pct_change(final_median: f64, current_price: f64) -> f64 {
    (final_median - current_price) / current_price
}

/// `1 - mean(relative spread)`, clamped to [0, 1] and rounded to 3 decimals.
pub fn confidence(forecasts: &[QuantileForecast], current_price: f64) -> f64 {
    if forecasts.is_empty() {
        return 0.0;
    }
    let denom = current_price.abs().max(MIN_SPREAD_DENOM);
    let avg_spread = forecasts
        .iter()
        .map(|f| (f.high - f.low) / denom)
        .sum::<f64>()
        / forecasts.len() as f64;
    round_to((1.0 - avg_spread).clamp(0.0, 1.0), 3)
}

/// `%g`-style formatting: `precision` significant digits, trailing zeros
/// dropped, scientific notation outside `[1e-4, 10^precision)`.
pub(crate) fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        let s = if value > 0.0 { "inf" } else { "-inf" };
        return s.to_string();
    }
    if value == 0.0 {
        let s = if value.is_sign_negative() { "-0" } else { "0" };
        return s.to_string();
    }

    let p = precision.max(1);
    let sci = format!("{:.*e}", p - 1, value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= p as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
    } else {
        let decimals = (p as i32 - 1 - exp) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn summary(pct_change: f64, ctx: &SignalContext<'_>, range_low: f64, range_high: f64) -> String {
    // +0.0 normalises a negative zero so the sign prefix stays single.
    let pct = pct_change * 100.0 + 0.0;
    let sign = if pct >= 0.0 { "+" } else { "" };
    let cov_note = if ctx.covariates_used.is_empty() {
        " (univariate)".to_string()
    } else {
        let names: Vec<&str> = ctx.covariates_used.iter().map(|c| c.as_str()).collect();
        format!(" (covariates: {})", names.join(", "))
    };
    format!(
        "Median {sign}{pct:.2}% over {}×{}min{cov_note}. Range ${}–${}",
        ctx.prediction_length,
        ctx.candle_minutes,
        format_general(range_low, SUMMARY_PRICE_DIGITS),
        format_general(range_high, SUMMARY_PRICE_DIGITS),
    )
}

/// Derive the signal from time-ordered forecasts and the last observed price.
pub fn derive_signal(
    forecasts: &[QuantileForecast],
    current_price: f64,
    ctx: &SignalContext<'_>,
) -> Result<Signal, ForecastError> {
    let (Some(first), Some(last)) = (forecasts.first(), forecasts.last()) else {
        return Err(ForecastError::execution("model returned an empty forecast"));
    };

    let pct_change = pct_change(last.median, current_price);
    if !pct_change.is_finite() {
        return Err(ForecastError::execution(format!(
            "pct_change is not finite (median={}, current_price={current_price})",
            last.median
        )));
    }

    Ok(Signal {
        pct_change,
        direction: Direction::from_pct_change(pct_change),
        confidence: confidence(forecasts, current_price),
        summary: summary(pct_change, ctx, first.low, last.high),
    })
}
