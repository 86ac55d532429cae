use chrono::{DateTime, Utc};

use crate::covariate::{AlignedCovariate, Covariate};
use crate::error::ForecastError;

/// Item id used when the request carries no token.
pub const DEFAULT_ITEM_ID: &str = "token";

/// Canonical per-candle context handed to the forecasting model.
///
/// Column-oriented: `timestamps`, `target` and every covariate column share
/// one length, and timestamps are strictly increasing at a fixed spacing.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextFrame {
    item_id: String,
    candle_minutes: u32,
    timestamps: Vec<DateTime<Utc>>,
    target: Vec<f64>,
    covariates: Vec<AlignedCovariate>,
}

/// One row of a [`ContextFrame`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContextRecord<'a> {
    pub item_id: &'a str,
    pub timestamp: DateTime<Utc>,
    pub target: f64,
    pub covariates: Vec<(Covariate, f64)>,
}

impl ContextFrame {
    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn candle_minutes(&self) -> u32 {
        self.candle_minutes
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }

    pub fn covariates(&self) -> &[AlignedCovariate] {
        &self.covariates
    }

    /// Covariate columns present in the frame, in canonical order.
    pub fn covariates_used(&self) -> Vec<Covariate> {
        self.covariates.iter().map(|c| c.covariate).collect()
    }

    /// Row view, oldest first.
    pub fn records(&self) -> impl Iterator<Item = ContextRecord<'_>> + '_ {
        (0..self.len()).map(move |i| ContextRecord {
            item_id: &self.item_id,
            timestamp: self.timestamps[i],
            target: self.target[i],
            covariates: self
                .covariates
                .iter()
                .map(|c| (c.covariate, c.values[i]))
                .collect(),
        })
    }
}

/// Truncate to the start of the minute.
fn floor_to_minute(now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let secs = now.timestamp();
    DateTime::from_timestamp(secs - secs.rem_euclid(60), 0)
}

/// Synthesize `n` candle timestamps spaced `candle_minutes` apart, the last
/// one at `now` truncated to the minute.
fn candle_timestamps(
    n: usize,
    candle_minutes: u32,
    now: DateTime<Utc>,
) -> Option<Vec<DateTime<Utc>>> {
    let anchor = floor_to_minute(now)?.timestamp();
    let step = i64::from(candle_minutes) * 60;
    (0..n)
        .map(|i| {
            let back = i64::try_from(n - 1 - i).ok()?.checked_mul(step)?;
            DateTime::from_timestamp(anchor.checked_sub(back)?, 0)
        })
        .collect()
}

/// Assemble the context frame from validated prices and aligned covariates.
///
/// `now` is the wall-clock anchor; callers inject it so the frame is
/// reproducible.
pub fn build_context_frame(
    token: Option<&str>,
    prices: &[f64],
    covariates: Vec<AlignedCovariate>,
    candle_minutes: u32,
    now: DateTime<Utc>,
) -> Result<ContextFrame, ForecastError> {
    let n = prices.len();
    if candle_minutes == 0 {
        return Err(ForecastError::invalid("candle_minutes must be >= 1"));
    }
    if let Some(bad) = covariates.iter().find(|c| c.values.len() != n) {
        return Err(ForecastError::invalid(format!(
            "covariate {} has {} values, expected {n}",
            bad.covariate,
            bad.values.len()
        )));
    }

    let timestamps = candle_timestamps(n, candle_minutes, now).ok_or_else(|| {
        ForecastError::invalid(format!(
            "{n} candles of {candle_minutes}min do not fit in the timestamp range"
        ))
    })?;

    let item_id = token
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_ITEM_ID)
        .to_string();

    Ok(ContextFrame {
        item_id,
        candle_minutes,
        timestamps,
        target: prices.to_vec(),
        covariates,
    })
}
