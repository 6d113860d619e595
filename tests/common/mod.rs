#![allow(dead_code)]

use barsignal::domain::backtest::BacktestConfig;
use barsignal::domain::error::BarsignalError;
pub use barsignal::domain::ohlcv::OhlcvBar;
use barsignal::ports::data_port::DataPort;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub fetches: AtomicUsize,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, BarsignalError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.errors.get(code) {
            return Err(BarsignalError::Provider {
                code: code.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.timestamp.date() >= start_date && b.timestamp.date() <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn midnight(s: &str) -> NaiveDateTime {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_bar(code: &str, date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        code: code.to_string(),
        timestamp: midnight(date),
        open: close - 0.5,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000,
    }
}

/// One bar per day from 2024-01-01 with the given closes.
pub fn bars_from_closes(code: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    let start = midnight("2024-01-01");
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            code: code.to_string(),
            timestamp: start + Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000,
        })
        .collect()
}

/// A drifting, oscillating series with varying volume.
pub fn generate_bars(code: &str, start_date: &str, count: usize, start_price: f64) -> Vec<OhlcvBar> {
    generate_bars_every(code, midnight(start_date), Duration::days(1), count, start_price)
}

/// [`generate_bars`] sampled every `step` from `start`.
pub fn generate_bars_every(
    code: &str,
    start: NaiveDateTime,
    step: Duration,
    count: usize,
    start_price: f64,
) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| {
            let t = i as f64;
            let close = start_price + t * 0.05 + (t * 0.35).sin() * 4.0 + (t * 0.11).cos() * 2.0;
            let open = close + (t * 0.9).sin();
            OhlcvBar {
                code: code.to_string(),
                timestamp: start + step * i as i32,
                open,
                high: close.max(open) + 1.0,
                low: close.min(open) - 1.0,
                close,
                volume: 1000 + ((i * 37) % 11) as i64 * 150,
            }
        })
        .collect()
}

/// Bars from `(open, high, low, close, volume)` tuples, one per day from 2024-01-01.
pub fn bars_from_candles(code: &str, candles: &[(f64, f64, f64, f64, i64)]) -> Vec<OhlcvBar> {
    let start = midnight("2024-01-01");
    candles
        .iter()
        .enumerate()
        .map(|(i, &(open, high, low, close, volume))| OhlcvBar {
            code: code.to_string(),
            timestamp: start + Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume,
        })
        .collect()
}

pub fn sample_config(codes: &[&str]) -> BacktestConfig {
    BacktestConfig {
        codes: codes.iter().map(|c| c.to_string()).collect(),
        start_date: date(2020, 1, 1),
        end_date: date(2030, 12, 31),
        data_dir: PathBuf::from("data"),
        parallel: true,
        cache: false,
    }
}
