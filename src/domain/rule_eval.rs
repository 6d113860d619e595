//! Rule evaluation engine.
//!
//! Evaluates rules against OHLCV data and pre-computed indicator values.
//!
//! # Evaluation Semantics
//!
//! - Comparison rules: Evaluate at the given bar index
//! - `CROSS_ABOVE`/`CROSS_BELOW`: Require `index >= 1`, return `false` at index 0
//! - `AND`: Short-circuits on first `false`
//! - `OR`: Short-circuits on first `true`
//! - `ANY_OF(rule, N)`: Child must be true at least once in the last N bars
//! - `PREV(x)`: Resolves `x` one bar earlier, NaN at index 0
//! - Invalid or missing indicator values resolve to NaN, so every comparison is `false`

use crate::domain::indicator::{IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::rule::{IndicatorField, IndicatorRef, Operand, Rule};
use std::collections::HashMap;

pub fn evaluate(
    rule: &Rule,
    ohlcv: &[OhlcvBar],
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
    bar_index: usize,
) -> bool {
    if bar_index >= ohlcv.len() {
        return false;
    }
    match rule {
        Rule::CrossAbove { left, right } => {
            if bar_index == 0 {
                return false;
            }
            let left_curr = resolve_operand(left, ohlcv, indicators, bar_index);
            let right_curr = resolve_operand(right, ohlcv, indicators, bar_index);
            let left_prev = resolve_operand(left, ohlcv, indicators, bar_index - 1);
            let right_prev = resolve_operand(right, ohlcv, indicators, bar_index - 1);

            left_curr > right_curr && left_prev <= right_prev
        }
        Rule::CrossBelow { left, right } => {
            if bar_index == 0 {
                return false;
            }
            let left_curr = resolve_operand(left, ohlcv, indicators, bar_index);
            let right_curr = resolve_operand(right, ohlcv, indicators, bar_index);
            let left_prev = resolve_operand(left, ohlcv, indicators, bar_index - 1);
            let right_prev = resolve_operand(right, ohlcv, indicators, bar_index - 1);

            left_curr < right_curr && left_prev >= right_prev
        }
        Rule::Above { left, right } => {
            let left_val = resolve_operand(left, ohlcv, indicators, bar_index);
            let right_val = resolve_operand(right, ohlcv, indicators, bar_index);
            left_val > right_val
        }
        Rule::Below { left, right } => {
            let left_val = resolve_operand(left, ohlcv, indicators, bar_index);
            let right_val = resolve_operand(right, ohlcv, indicators, bar_index);
            left_val < right_val
        }
        Rule::And(rules) => {
            for r in rules {
                if !evaluate(r, ohlcv, indicators, bar_index) {
                    return false;
                }
            }
            true
        }
        Rule::Or(rules) => rules
            .iter()
            .any(|r| evaluate(r, ohlcv, indicators, bar_index)),
        Rule::AnyOf { rule, count } => {
            if *count == 0 {
                return false;
            }
            let start = bar_index.saturating_sub(*count - 1);
            for i in start..=bar_index {
                if evaluate(rule, ohlcv, indicators, i) {
                    return true;
                }
            }
            false
        }
        Rule::BullishEngulfsLastBearish => bullish_engulfs_last_bearish(ohlcv, bar_index),
    }
}

/// Per-bar flags for `rule` over the whole bar sequence.
pub fn evaluate_series(
    rule: &Rule,
    ohlcv: &[OhlcvBar],
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
) -> Vec<bool> {
    (0..ohlcv.len())
        .map(|i| evaluate(rule, ohlcv, indicators, i))
        .collect()
}

fn bullish_engulfs_last_bearish(ohlcv: &[OhlcvBar], bar_index: usize) -> bool {
    let current = &ohlcv[bar_index];
    if !current.is_bullish() {
        return false;
    }
    match ohlcv[..bar_index].iter().rev().find(|bar| bar.is_bearish()) {
        Some(bearish) => current.body() > bearish.body(),
        None => false,
    }
}

pub fn resolve_operand(
    operand: &Operand,
    ohlcv: &[OhlcvBar],
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
    bar_index: usize,
) -> f64 {
    let Some(bar) = ohlcv.get(bar_index) else {
        return f64::NAN;
    };
    match operand {
        Operand::Open => bar.open,
        Operand::High => bar.high,
        Operand::Low => bar.low,
        Operand::Close => bar.close,
        Operand::Volume => bar.volume as f64,
        Operand::Constant(v) => *v,
        Operand::Indicator(ind_ref) => resolve_indicator(ind_ref, indicators, bar_index),
        Operand::Previous(inner) => match bar_index.checked_sub(1) {
            Some(prev) => resolve_operand(inner, ohlcv, indicators, prev),
            None => f64::NAN,
        },
        Operand::Scaled { operand, factor } => {
            factor * resolve_operand(operand, ohlcv, indicators, bar_index)
        }
    }
}

fn resolve_indicator(
    ind_ref: &IndicatorRef,
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
    bar_index: usize,
) -> f64 {
    let series = match indicators.get(&ind_ref.indicator_type) {
        Some(s) => s,
        None => return f64::NAN,
    };

    let point = match series.values.get(bar_index) {
        Some(p) => p,
        None => return f64::NAN,
    };
    if !point.valid {
        return f64::NAN;
    }

    extract_field(&point.value, ind_ref.field)
}

fn extract_field(value: &IndicatorValue, field: IndicatorField) -> f64 {
    match (value, field) {
        (IndicatorValue::Simple(v), IndicatorField::Value) => *v,
        (IndicatorValue::Macd { line, .. }, IndicatorField::MacdLine | IndicatorField::Value) => {
            *line
        }
        (IndicatorValue::Macd { signal, .. }, IndicatorField::MacdSignal) => *signal,
        (IndicatorValue::Macd { histogram, .. }, IndicatorField::MacdHistogram) => *histogram,
        (IndicatorValue::Bollinger { upper, .. }, IndicatorField::BollingerUpper) => *upper,
        (
            IndicatorValue::Bollinger { middle, .. },
            IndicatorField::BollingerMiddle | IndicatorField::Value,
        ) => *middle,
        (IndicatorValue::Bollinger { lower, .. }, IndicatorField::BollingerLower) => *lower,
        (IndicatorValue::Adx { adx, .. }, IndicatorField::Adx | IndicatorField::Value) => *adx,
        (IndicatorValue::Adx { plus_di, .. }, IndicatorField::PlusDi) => *plus_di,
        (IndicatorValue::Adx { minus_di, .. }, IndicatorField::MinusDi) => *minus_di,
        _ => f64::NAN,
    }
}
