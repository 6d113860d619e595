//! ADX (Average Directional Index) indicator.
//!
//! For each bar after the first:
//! - up = H[i] - H[i-1], down = L[i-1] - L[i]
//! - +DM = up when up > down and up > 0, else 0; -DM symmetric
//! - TR = max(H - L, |H - C[i-1]|, |L - C[i-1]|)
//!
//! +DM, -DM and TR are smoothed with an exponential mean (alpha = 1/n) seeded at
//! the second bar. DI± = 100 * smoothed(DM±) / smoothed(TR),
//! DX = 100 * |DI+ - DI-| / (DI+ + DI-), ADX = smoothed(DX).
//!
//! Warmup: first n bars are invalid.

use crate::domain::indicator::{
    require_bars, IndicatorError, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::indicator_helpers::exponential_mean;
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 14;

fn ratio_pct(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        100.0 * numerator / denominator
    } else {
        0.0
    }
}

pub fn calculate_adx(bars: &[OhlcvBar], period: usize) -> Result<IndicatorSeries, IndicatorError> {
    let indicator_type = IndicatorType::Adx(period);
    require_bars(&indicator_type, bars.len())?;

    let steps = bars.len() - 1;
    let mut plus_dm = Vec::with_capacity(steps);
    let mut minus_dm = Vec::with_capacity(steps);
    let mut true_range = Vec::with_capacity(steps);

    for pair in bars.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let up = curr.high - prev.high;
        let down = prev.low - curr.low;
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
        true_range.push(curr.true_range(prev.close));
    }

    let alpha = 1.0 / period as f64;
    let smooth_plus = exponential_mean(&plus_dm, alpha);
    let smooth_minus = exponential_mean(&minus_dm, alpha);
    let smooth_tr = exponential_mean(&true_range, alpha);

    let mut plus_di = Vec::with_capacity(steps);
    let mut minus_di = Vec::with_capacity(steps);
    let mut dx = Vec::with_capacity(steps);
    for j in 0..steps {
        let p = ratio_pct(smooth_plus[j], smooth_tr[j]);
        let m = ratio_pct(smooth_minus[j], smooth_tr[j]);
        plus_di.push(p);
        minus_di.push(m);
        dx.push(ratio_pct((p - m).abs(), p + m));
    }
    let adx = exponential_mean(&dx, alpha);

    let mut values = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let value = if i == 0 {
            IndicatorValue::Adx {
                adx: 0.0,
                plus_di: 0.0,
                minus_di: 0.0,
            }
        } else {
            IndicatorValue::Adx {
                adx: adx[i - 1],
                plus_di: plus_di[i - 1],
                minus_di: minus_di[i - 1],
            }
        };
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: i >= period,
            value,
        });
    }

    Ok(IndicatorSeries {
        indicator_type,
        values,
    })
}
