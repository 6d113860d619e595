//! Domain error types.

use crate::domain::indicator::IndicatorError;

/// Top-level error type for barsignal.
#[derive(Debug, thiserror::Error)]
pub enum BarsignalError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("provider error for {code}: {reason}")]
    Provider { code: String, reason: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("insufficient data for {code}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error("malformed bar for {code} at index {index}: {reason}")]
    MalformedBar {
        code: String,
        index: usize,
        reason: String,
    },

    #[error("non-monotonic timestamp for {code} at index {index}")]
    NonMonotonic { code: String, index: usize },

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BarsignalError {
    /// True for errors that skip a single ticker without failing the batch.
    pub fn is_per_ticker(&self) -> bool {
        matches!(
            self,
            BarsignalError::Provider { .. }
                | BarsignalError::NoData { .. }
                | BarsignalError::InsufficientData { .. }
                | BarsignalError::MalformedBar { .. }
                | BarsignalError::NonMonotonic { .. }
                | BarsignalError::Indicator(_)
        )
    }
}

impl From<&BarsignalError> for std::process::ExitCode {
    fn from(err: &BarsignalError) -> Self {
        let code: u8 = match err {
            BarsignalError::Io(_) => 1,
            BarsignalError::ConfigParse { .. }
            | BarsignalError::ConfigMissing { .. }
            | BarsignalError::ConfigInvalid { .. } => 2,
            BarsignalError::Provider { .. } => 3,
            BarsignalError::NoData { .. }
            | BarsignalError::InsufficientData { .. }
            | BarsignalError::Indicator(_) => 5,
            BarsignalError::MalformedBar { .. } | BarsignalError::NonMonotonic { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
