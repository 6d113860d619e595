//! Memoized indicator series.
//!
//! Keyed by `(ticker, first bar timestamp, last bar timestamp, indicator)`. The cache
//! only avoids recomputation; a hit returns exactly what a fresh computation
//! over the same bars would.

use crate::domain::indicator::{IndicatorError, IndicatorSeries, IndicatorType};
use crate::domain::indicator_helpers::compute_indicator;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub code: String,
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
    pub indicator_type: IndicatorType,
}

#[derive(Debug, Default)]
pub struct IndicatorCache {
    entries: RwLock<HashMap<CacheKey, IndicatorSeries>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl IndicatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn get_or_compute(
        &self,
        code: &str,
        bars: &[OhlcvBar],
        indicator_type: &IndicatorType,
    ) -> Result<IndicatorSeries, IndicatorError> {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return compute_indicator(bars, indicator_type);
        };
        let key = CacheKey {
            code: code.to_string(),
            first: first.timestamp,
            last: last.timestamp,
            indicator_type: indicator_type.clone(),
        };

        if let Ok(entries) = self.entries.read() {
            if let Some(series) = entries.get(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(series.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let series = compute_indicator(bars, indicator_type)?;
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, series.clone());
        }
        Ok(series)
    }

    /// Cached counterpart of `compute_indicators`.
    pub fn compute_all(
        &self,
        code: &str,
        bars: &[OhlcvBar],
        indicator_types: &[IndicatorType],
    ) -> Result<HashMap<IndicatorType, IndicatorSeries>, IndicatorError> {
        let mut map = HashMap::with_capacity(indicator_types.len());
        for indicator_type in indicator_types {
            if map.contains_key(indicator_type) {
                continue;
            }
            let series = self.get_or_compute(code, bars, indicator_type)?;
            map.insert(indicator_type.clone(), series);
        }
        Ok(map)
    }
}
