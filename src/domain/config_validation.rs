//! Configuration reading and validation.
//!
//! Values are read as strings so a malformed number is reported instead of
//! silently falling back to its default.

use crate::domain::error::BarsignalError;
use crate::domain::strategy::{Strategy, StrategyConfig};
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const BACKTEST_KEYS: &[&str] = &[
    "codes",
    "start_date",
    "end_date",
    "data_dir",
    "parallel",
    "cache",
];

pub const STRATEGY_KEYS: &[&str] = &[
    "profile",
    "interval",
    "fast_window",
    "slow_window",
    "trend_fast_window",
    "trend_slow_window",
    "pullback_fast_window",
    "pullback_slow_window",
    "rsi_window",
    "bollinger_window",
    "volume_window",
    "macd_fast",
    "macd_slow",
    "macd_signal",
    "rsi_entry_threshold",
    "rsi_exit_threshold",
    "bollinger_k",
    "stop_loss_pct",
    "profit_target_pct",
    "volume_multiplier",
    "max_holding_bars",
    "exit_priority",
];

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BarsignalError {
    BarsignalError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn present(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn optional_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, BarsignalError> {
    match present(config, section, key) {
        None => Ok(None),
        Some(raw) => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(invalid(section, key, format!("expected a number, got {:?}", raw))),
        },
    }
}

pub fn optional_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<usize>, BarsignalError> {
    match present(config, section, key) {
        None => Ok(None),
        Some(raw) => raw.parse::<usize>().map(Some).map_err(|_| {
            invalid(
                section,
                key,
                format!("expected a non-negative integer, got {:?}", raw),
            )
        }),
    }
}

pub fn optional_bool(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<bool>, BarsignalError> {
    match present(config, section, key) {
        None => Ok(None),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Some(true)),
            "false" | "no" | "off" | "0" => Ok(Some(false)),
            _ => Err(invalid(
                section,
                key,
                format!("expected true or false, got {:?}", raw),
            )),
        },
    }
}

/// Keys present in `section` that nothing reads.
pub fn unknown_keys(config: &dyn ConfigPort, section: &str, known: &[&str]) -> Vec<String> {
    config
        .keys(section)
        .into_iter()
        .filter(|key| !known.contains(&key.as_str()))
        .collect()
}

pub fn required_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<NaiveDate, BarsignalError> {
    let raw = present(config, section, key).ok_or_else(|| BarsignalError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    })?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| invalid(section, key, "invalid date format (expected YYYY-MM-DD)"))
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BarsignalError> {
    let start = required_date(config, "backtest", "start_date")?;
    let end = required_date(config, "backtest", "end_date")?;
    validate_date_range(start, end)?;
    validate_codes(config)?;
    Ok(())
}

pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), BarsignalError> {
    if start > end {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

fn validate_codes(config: &dyn ConfigPort) -> Result<(), BarsignalError> {
    let raw = present(config, "backtest", "codes").ok_or_else(|| BarsignalError::ConfigMissing {
        section: "backtest".to_string(),
        key: "codes".to_string(),
    })?;
    parse_codes(&raw).map_err(|e| invalid("backtest", "codes", e.to_string()))?;
    Ok(())
}

pub fn validate_strategy_config(strategy: &StrategyConfig) -> Result<(), BarsignalError> {
    let windows = [
        ("fast_window", strategy.fast_window),
        ("slow_window", strategy.slow_window),
        ("trend_fast_window", strategy.trend_fast_window),
        ("trend_slow_window", strategy.trend_slow_window),
        ("pullback_fast_window", strategy.pullback_fast_window),
        ("pullback_slow_window", strategy.pullback_slow_window),
        ("rsi_window", strategy.rsi_window),
        ("bollinger_window", strategy.bollinger_window),
        ("volume_window", strategy.volume_window),
        ("macd_fast", strategy.macd_fast),
        ("macd_slow", strategy.macd_slow),
        ("macd_signal", strategy.macd_signal),
    ];
    for (key, value) in windows {
        if value == 0 {
            return Err(invalid("strategy", key, format!("{} must be positive", key)));
        }
    }

    if strategy.fast_window >= strategy.slow_window {
        return Err(invalid(
            "strategy",
            "fast_window",
            "fast_window must be smaller than slow_window",
        ));
    }
    if strategy.trend_fast_window >= strategy.trend_slow_window {
        return Err(invalid(
            "strategy",
            "trend_fast_window",
            "trend_fast_window must be smaller than trend_slow_window",
        ));
    }
    if strategy.pullback_fast_window >= strategy.pullback_slow_window {
        return Err(invalid(
            "strategy",
            "pullback_fast_window",
            "pullback_fast_window must be smaller than pullback_slow_window",
        ));
    }
    if strategy.macd_fast >= strategy.macd_slow {
        return Err(invalid(
            "strategy",
            "macd_fast",
            "macd_fast must be smaller than macd_slow",
        ));
    }

    for (key, value) in [
        ("rsi_entry_threshold", strategy.rsi_entry_threshold),
        ("rsi_exit_threshold", strategy.rsi_exit_threshold),
    ] {
        if !(0.0..=100.0).contains(&value) {
            return Err(invalid("strategy", key, format!("{} must be within 0-100", key)));
        }
    }

    if strategy.stop_loss_pct <= 0.0 || strategy.stop_loss_pct >= 1.0 {
        return Err(invalid(
            "strategy",
            "stop_loss_pct",
            "stop_loss_pct must be between 0 and 1 (exclusive)",
        ));
    }
    if strategy.profit_target_pct <= 0.0 {
        return Err(invalid(
            "strategy",
            "profit_target_pct",
            "profit_target_pct must be positive",
        ));
    }
    if strategy.bollinger_k <= 0.0 {
        return Err(invalid(
            "strategy",
            "bollinger_k",
            "bollinger_k must be positive",
        ));
    }
    if strategy.volume_multiplier < 0.0 {
        return Err(invalid(
            "strategy",
            "volume_multiplier",
            "volume_multiplier must be non-negative",
        ));
    }
    Ok(())
}

/// Reject entry rules that compare an operand with itself.
///
/// Windows from different groups can be overridden to the same value, which
/// leaves a comparison that never holds.
pub fn validate_entry_rule(strategy: &Strategy) -> Result<(), BarsignalError> {
    match strategy.entry.self_comparison() {
        Some(operand) => Err(invalid(
            "strategy",
            "profile",
            format!(
                "{} entry rule compares {} with itself",
                strategy.profile, operand
            ),
        )),
        None => Ok(()),
    }
}
