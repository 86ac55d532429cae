//! Pure feature alignment and forecast-to-signal primitives for the forecast hub.
//!
//! Nothing in this crate performs I/O. The single call into the external
//! forecasting model sits between [`pipeline::prepare`] and
//! [`pipeline::finish`]; everything before and after it lives here.

pub mod covariate;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod quantile;
pub mod request;
pub mod response;
pub mod signal;
pub mod validate;

pub use covariate::{AlignedCovariate, Covariate, CovariateInputs, align_covariate, align_covariates};
pub use error::{ErrorKind, ForecastError};
pub use frame::{ContextFrame, ContextRecord, DEFAULT_ITEM_ID, build_context_frame};
pub use pipeline::{PredictParams, PreparedForecast, finish, prepare};
pub use quantile::{QUANTILE_LEVELS, QuantileForecast, QuantileRow, decode_forecast};
pub use request::{ForecastRequest, RequestLimits};
pub use response::{ForecastResponse, assemble_response};
pub use signal::{Direction, Signal, SignalContext, derive_signal};
pub use validate::{MIN_PRICE_POINTS, validate_prices, validate_request};
