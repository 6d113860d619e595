//! Exponential Moving Average indicator.
//!
//! alpha = 2/(n+1), EMA[0] = C[0], then EMA[i] = C[i]*alpha + EMA[i-1]*(1-alpha).
//! Valid from the first bar; early values lean toward the seed.

use crate::domain::indicator::{
    require_bars, IndicatorError, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::indicator_helpers::{closes, exponential_mean};
use crate::domain::ohlcv::OhlcvBar;

pub fn smoothing_factor(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

pub fn calculate_ema(bars: &[OhlcvBar], period: usize) -> Result<IndicatorSeries, IndicatorError> {
    let indicator_type = IndicatorType::Ema(period);
    require_bars(&indicator_type, bars.len())?;

    let ema = exponential_mean(&closes(bars), smoothing_factor(period));
    let values = bars
        .iter()
        .zip(ema)
        .map(|(bar, v)| IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: IndicatorValue::Simple(v),
        })
        .collect();

    Ok(IndicatorSeries {
        indicator_type,
        values,
    })
}
