//! OHLCV bar representation and sequence validation.

use crate::domain::error::BarsignalError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub code: String,
    /// Daily bars carry midnight.
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// |close - open|
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Parses `YYYY-MM-DD` (as midnight) or a date with an `HH:MM[:SS]` time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Date only for midnight timestamps, date and time otherwise.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    if ts.time() == NaiveTime::MIN {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Checks every bar for sane prices and the sequence for strictly increasing timestamps.
///
/// Returns the first offending index.
pub fn validate_bars(code: &str, bars: &[OhlcvBar]) -> Result<(), BarsignalError> {
    for (i, bar) in bars.iter().enumerate() {
        let prices = [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("close", bar.close),
        ];
        for (name, value) in prices {
            if !value.is_finite() || value <= 0.0 {
                return Err(BarsignalError::MalformedBar {
                    code: code.to_string(),
                    index: i,
                    reason: format!("{name} must be a positive number, got {value}"),
                });
            }
        }
        if bar.high < bar.low {
            return Err(BarsignalError::MalformedBar {
                code: code.to_string(),
                index: i,
                reason: format!("high {} below low {}", bar.high, bar.low),
            });
        }
        if bar.volume < 0 {
            return Err(BarsignalError::MalformedBar {
                code: code.to_string(),
                index: i,
                reason: format!("negative volume {}", bar.volume),
            });
        }
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(BarsignalError::NonMonotonic {
                code: code.to_string(),
                index: i,
            });
        }
    }
    Ok(())
}
