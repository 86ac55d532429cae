//! Past covariates and their alignment to the price context.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named auxiliary series that may accompany the price history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Covariate {
    Rsi,
    Liquidity,
    Volume,
    BuyPressure,
}

impl Covariate {
    /// Canonical reporting order.
    pub const ALL: [Covariate; 4] = [
        Covariate::Rsi,
        Covariate::Liquidity,
        Covariate::Volume,
        Covariate::BuyPressure,
    ];

    /// Column name in the context frame and in `covariates_used`.
    pub fn as_str(self) -> &'static str {
        match self {
            Covariate::Rsi => "rsi",
            Covariate::Liquidity => "liquidity",
            Covariate::Volume => "volume",
            Covariate::BuyPressure => "buy_pressure",
        }
    }
}

impl fmt::Display for Covariate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw covariate arrays as supplied by the client, each independently optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CovariateInputs {
    #[serde(default)]
    pub rsi_history: Option<Vec<f64>>,
    #[serde(default)]
    pub liquidity_history: Option<Vec<f64>>,
    #[serde(default)]
    pub volume_history: Option<Vec<f64>>,
    #[serde(default)]
    pub buy_pressure: Option<Vec<f64>>,
}

impl CovariateInputs {
    pub fn get(&self, covariate: Covariate) -> Option<&[f64]> {
        match covariate {
            Covariate::Rsi => self.rsi_history.as_deref(),
            Covariate::Liquidity => self.liquidity_history.as_deref(),
            Covariate::Volume => self.volume_history.as_deref(),
            Covariate::BuyPressure => self.buy_pressure.as_deref(),
        }
    }

    /// Supplied covariates, in canonical order.
    pub fn supplied(&self) -> Vec<Covariate> {
        Covariate::ALL
            .into_iter()
            .filter(|c| self.get(*c).is_some())
            .collect()
    }
}

/// A covariate column trimmed or padded to the context length.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedCovariate {
    pub covariate: Covariate,
    pub values: Vec<f64>,
}

/// Fit `raw` to exactly `n` values.
///
/// Longer input keeps its most recent `n` values. Shorter input is
/// left-padded with repeats of its first value. Returns `None` when there is
/// nothing to pad from.
pub fn align_covariate(raw: &[f64], n: usize) -> Option<Vec<f64>> {
    if raw.len() >= n {
        return Some(raw[raw.len() - n..].to_vec());
    }
    let first = *raw.first()?;
    let mut out = Vec::with_capacity(n);
    out.resize(n - raw.len(), first);
    out.extend_from_slice(raw);
    Some(out)
}

/// Align every supplied covariate to `n`, in canonical order.
pub fn align_covariates(inputs: &CovariateInputs, n: usize) -> Vec<AlignedCovariate> {
    Covariate::ALL
        .into_iter()
        .filter_map(|covariate| {
            let raw = inputs.get(covariate)?;
            let values = align_covariate(raw, n)?;
            Some(AlignedCovariate { covariate, values })
        })
        .collect()
}
