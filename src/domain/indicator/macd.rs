//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line, seeded with the first MACD value
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9.
//! Every point is valid; at least max(fast, slow) + 1 bars are required.

use crate::domain::indicator::ema::smoothing_factor;
use crate::domain::indicator::{
    require_bars, IndicatorError, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::indicator_helpers::{closes, exponential_mean};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[OhlcvBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Result<IndicatorSeries, IndicatorError> {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if fast == 0 || slow == 0 || signal_period == 0 {
        return Err(IndicatorError::InvalidPeriod);
    }
    require_bars(&indicator_type, bars.len())?;

    let prices = closes(bars);
    let ema_fast = exponential_mean(&prices, smoothing_factor(fast));
    let ema_slow = exponential_mean(&prices, smoothing_factor(slow));

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = exponential_mean(&macd_line, smoothing_factor(signal_period));

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: IndicatorValue::Macd {
                line: macd_line[i],
                signal: signal_line[i],
                histogram: macd_line[i] - signal_line[i],
            },
        })
        .collect();

    Ok(IndicatorSeries {
        indicator_type,
        values,
    })
}

pub fn calculate_macd_default(bars: &[OhlcvBar]) -> Result<IndicatorSeries, IndicatorError> {
    calculate_macd(bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}
