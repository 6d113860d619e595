//! Shared helper functions for indicator calculations.

use crate::domain::indicator::{
    calculate_adx, calculate_bollinger, calculate_ema, calculate_macd, calculate_rsi,
    calculate_sma, calculate_volume_sma, IndicatorError, IndicatorSeries, IndicatorType,
};
use crate::domain::ohlcv::OhlcvBar;
use std::collections::HashMap;

/// Trailing mean over `period` values; `None` until the window is full.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if period == 0 {
        out.resize(values.len(), None);
        return out;
    }

    for i in 0..values.len() {
        if i + 1 >= period {
            let window = &values[i + 1 - period..=i];
            out.push(Some(window.iter().sum::<f64>() / period as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Recursive exponential mean seeded with the first value:
/// out[0] = x[0], out[i] = alpha * x[i] + (1 - alpha) * out[i-1].
pub fn exponential_mean(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev = 0.0;
    for (i, &v) in values.iter().enumerate() {
        prev = if i == 0 { v } else { alpha * v + (1.0 - alpha) * prev };
        out.push(prev);
    }
    out
}

pub fn closes(bars: &[OhlcvBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Compute one indicator series by identity.
pub fn compute_indicator(
    bars: &[OhlcvBar],
    indicator_type: &IndicatorType,
) -> Result<IndicatorSeries, IndicatorError> {
    match *indicator_type {
        IndicatorType::Sma(period) => calculate_sma(bars, period),
        IndicatorType::Ema(period) => calculate_ema(bars, period),
        IndicatorType::Rsi(period) => calculate_rsi(bars, period),
        IndicatorType::Adx(period) => calculate_adx(bars, period),
        IndicatorType::VolumeSma(period) => calculate_volume_sma(bars, period),
        IndicatorType::Macd { fast, slow, signal } => calculate_macd(bars, fast, slow, signal),
        IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        } => calculate_bollinger(bars, period, stddev_mult_x100),
    }
}

/// Compute every requested indicator, keyed by identity. Duplicates are computed once.
pub fn compute_indicators(
    bars: &[OhlcvBar],
    indicator_types: &[IndicatorType],
) -> Result<HashMap<IndicatorType, IndicatorSeries>, IndicatorError> {
    let mut map = HashMap::with_capacity(indicator_types.len());
    for indicator_type in indicator_types {
        if map.contains_key(indicator_type) {
            continue;
        }
        let series = compute_indicator(bars, indicator_type)?;
        map.insert(indicator_type.clone(), series);
    }
    Ok(map)
}
