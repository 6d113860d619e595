//! Simple Moving Average over closes, and over volume for volume confirmation.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]).
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{
    require_bars, IndicatorError, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::indicator_helpers::{closes, rolling_mean};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> Result<IndicatorSeries, IndicatorError> {
    let indicator_type = IndicatorType::Sma(period);
    require_bars(&indicator_type, bars.len())?;
    Ok(build_series(bars, indicator_type, &closes(bars), period))
}

pub fn calculate_volume_sma(
    bars: &[OhlcvBar],
    period: usize,
) -> Result<IndicatorSeries, IndicatorError> {
    let indicator_type = IndicatorType::VolumeSma(period);
    require_bars(&indicator_type, bars.len())?;
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();
    Ok(build_series(bars, indicator_type, &volumes, period))
}

fn build_series(
    bars: &[OhlcvBar],
    indicator_type: IndicatorType,
    inputs: &[f64],
    period: usize,
) -> IndicatorSeries {
    let values = bars
        .iter()
        .zip(rolling_mean(inputs, period))
        .map(|(bar, mean)| IndicatorPoint {
            timestamp: bar.timestamp,
            valid: mean.is_some(),
            value: IndicatorValue::Simple(mean.unwrap_or(0.0)),
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}
