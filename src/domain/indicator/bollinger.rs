//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are invalid.

use crate::domain::indicator::stddev::rolling_stddev;
use crate::domain::indicator::{
    require_bars, IndicatorError, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::indicator_helpers::{closes, rolling_mean};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULT_X100: u32 = 200;

/// Multiplier stored as hundredths so the indicator identity stays hashable.
pub fn mult_to_x100(mult: f64) -> u32 {
    (mult * 100.0).round().max(0.0) as u32
}

pub fn calculate_bollinger(
    bars: &[OhlcvBar],
    period: usize,
    stddev_mult_x100: u32,
) -> Result<IndicatorSeries, IndicatorError> {
    let indicator_type = IndicatorType::Bollinger {
        period,
        stddev_mult_x100,
    };
    require_bars(&indicator_type, bars.len())?;

    let mult = stddev_mult_x100 as f64 / 100.0;
    let prices = closes(bars);
    let middles = rolling_mean(&prices, period);
    let stddevs = rolling_stddev(&prices, period);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let (valid, value) = match (middles[i], stddevs[i]) {
                (Some(middle), Some(sd)) => (
                    true,
                    IndicatorValue::Bollinger {
                        upper: middle + mult * sd,
                        middle,
                        lower: middle - mult * sd,
                    },
                ),
                _ => (
                    false,
                    IndicatorValue::Bollinger {
                        upper: 0.0,
                        middle: 0.0,
                        lower: 0.0,
                    },
                ),
            };
            IndicatorPoint {
                timestamp: bar.timestamp,
                valid,
                value,
            }
        })
        .collect();

    Ok(IndicatorSeries {
        indicator_type,
        values,
    })
}
