use thiserror::Error;

/// Coarse error category, for callers that map errors onto transport codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    ModelNotReady,
    Execution,
}

/// Every way a forecast request can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    /// Fewer price points than the model needs as context.
    #[error("Need >= {required} price points, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    /// Any other malformed request field.
    #[error("{0}")]
    InvalidInput(String),

    /// The forecasting model has not finished loading.
    #[error("model not loaded yet")]
    ModelNotReady,

    /// Failure inside the model call or the numeric derivation after it.
    #[error("{0}")]
    Execution(String),
}

impl ForecastError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientHistory { .. } | Self::InvalidInput(_) => ErrorKind::Validation,
            Self::ModelNotReady => ErrorKind::ModelNotReady,
            Self::Execution(_) => ErrorKind::Execution,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }
}
