//! CSV directory data adapter.
//!
//! One file per ticker at `{base_path}/{CODE}.csv` with header
//! `date,open,high,low,close,volume`. The first column holds a date or a
//! date and time, so the same layout carries daily and intraday bars.

use crate::domain::error::BarsignalError;
use crate::domain::ohlcv::{parse_timestamp, OhlcvBar};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }
}

fn parse_field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    code: &str,
) -> Result<T, BarsignalError>
where
    T::Err: std::fmt::Display,
{
    let raw = record.get(index).ok_or_else(|| BarsignalError::Provider {
        code: code.to_string(),
        reason: format!("missing {} column", name),
    })?;
    raw.trim().parse().map_err(|e: T::Err| BarsignalError::Provider {
        code: code.to_string(),
        reason: format!("invalid {} value {:?}: {}", name, raw, e),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, BarsignalError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| BarsignalError::Provider {
            code: code.to_string(),
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| BarsignalError::Provider {
                code: code.to_string(),
                reason: format!("CSV parse error: {}", e),
            })?;

            let raw: String = parse_field(&record, 0, "date", code)?;
            let timestamp = parse_timestamp(&raw).ok_or_else(|| BarsignalError::Provider {
                code: code.to_string(),
                reason: format!("invalid timestamp {:?}", raw),
            })?;

            let day = timestamp.date();
            if day < start_date || day > end_date {
                continue;
            }

            bars.push(OhlcvBar {
                code: code.to_string(),
                timestamp,
                open: parse_field(&record, 1, "open", code)?,
                high: parse_field(&record, 2, "high", code)?,
                low: parse_field(&record, 3, "low", code)?,
                close: parse_field(&record, 4, "close", code)?,
                volume: parse_field(&record, 5, "volume", code)?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        debug!(code, bars = bars.len(), path = %path.display(), "loaded csv");
        Ok(bars)
    }
}
