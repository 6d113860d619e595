//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values aligned 1:1 with bars

pub mod adx;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stddev;

pub use adx::calculate_adx;
pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::{calculate_sma, calculate_volume_sma};

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndicatorError {
    #[error("indicator period must be positive")]
    InvalidPeriod,

    #[error("insufficient data for {indicator}: have {bars} bars, need {required}")]
    InsufficientData {
        indicator: String,
        required: usize,
        bars: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
    Adx {
        adx: f64,
        plus_di: f64,
        minus_di: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Adx(usize),
    VolumeSma(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

impl IndicatorType {
    /// Smallest bar count for which the indicator can be computed at all.
    pub fn min_bars(&self) -> usize {
        match self {
            IndicatorType::Sma(period)
            | IndicatorType::VolumeSma(period)
            | IndicatorType::Bollinger { period, .. } => *period,
            IndicatorType::Ema(_) => 1,
            IndicatorType::Rsi(period) | IndicatorType::Adx(period) => period + 1,
            IndicatorType::Macd { fast, slow, .. } => fast.max(slow) + 1,
        }
    }

    /// Largest lookback window the indicator uses.
    pub fn window(&self) -> usize {
        match self {
            IndicatorType::Sma(p)
            | IndicatorType::Ema(p)
            | IndicatorType::Rsi(p)
            | IndicatorType::Adx(p)
            | IndicatorType::VolumeSma(p)
            | IndicatorType::Bollinger { period: p, .. } => *p,
            IndicatorType::Macd { fast, slow, signal } => *fast.max(slow).max(signal),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// The scalar value at `index`, or `None` during warm-up or for multi-value indicators.
    pub fn simple_at(&self, index: usize) -> Option<f64> {
        match self.values.get(index) {
            Some(IndicatorPoint {
                valid: true,
                value: IndicatorValue::Simple(v),
                ..
            }) => Some(*v),
            _ => None,
        }
    }

    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|p| p.valid).count()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Adx(period) => write!(f, "ADX({})", period),
            IndicatorType::VolumeSma(period) => write!(f, "VOLUME_SMA({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}

/// Fail with `InsufficientData` unless `bars >= required`.
pub(crate) fn require_bars(
    indicator_type: &IndicatorType,
    bars: usize,
) -> Result<(), IndicatorError> {
    if indicator_type.window() == 0 {
        return Err(IndicatorError::InvalidPeriod);
    }
    let required = indicator_type.min_bars();
    if bars < required {
        return Err(IndicatorError::InsufficientData {
            indicator: indicator_type.to_string(),
            required,
            bars,
        });
    }
    Ok(())
}
