//! Per-ticker pipeline and batch runner.
//!
//! Each ticker runs indicators, the entry rule, the bar walk and metrics on its
//! own bars. Market data for the whole batch is fetched before any computation
//! starts. A failure for one ticker is recorded and the rest of the batch
//! continues. Results keep the input code order.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::cache::IndicatorCache;
use crate::domain::error::BarsignalError;
use crate::domain::execution::walk;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::indicator_helpers::compute_indicators;
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::ohlcv::{validate_bars, OhlcvBar};
use crate::domain::position::{OpenTrade, PositionState, Trade};
use crate::domain::rule_eval::evaluate_series;
use crate::domain::strategy::Strategy;
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub codes: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub data_dir: PathBuf,
    pub parallel: bool,
    pub cache: bool,
}

#[derive(Debug, Clone)]
pub struct TickerReport {
    pub code: String,
    pub bars: usize,
    pub first_timestamp: NaiveDateTime,
    pub last_timestamp: NaiveDateTime,
    pub trades: Vec<Trade>,
    pub open_trade: Option<OpenTrade>,
    pub final_state: PositionState,
    pub metrics: PerformanceMetrics,
}

#[derive(Debug)]
pub struct TickerFailure {
    pub code: String,
    pub error: BarsignalError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub reports: Vec<TickerReport>,
    pub failures: Vec<TickerFailure>,
}

/// One row of the derived per-bar flag view.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRow {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub entry_signal: bool,
    pub sell_signal: bool,
    pub held: bool,
}

fn prepare(
    code: &str,
    ohlcv: &[OhlcvBar],
    strategy: &Strategy,
    cache: Option<&IndicatorCache>,
) -> Result<HashMap<IndicatorType, IndicatorSeries>, BarsignalError> {
    if ohlcv.is_empty() {
        return Err(BarsignalError::NoData {
            code: code.to_string(),
        });
    }
    validate_bars(code, ohlcv)?;

    let minimum = strategy.min_bars();
    if ohlcv.len() < minimum {
        return Err(BarsignalError::InsufficientData {
            code: code.to_string(),
            bars: ohlcv.len(),
            minimum,
        });
    }

    let indicator_types = strategy.required_indicators();
    let indicators = match cache {
        Some(cache) => cache.compute_all(code, ohlcv, &indicator_types)?,
        None => compute_indicators(ohlcv, &indicator_types)?,
    };
    Ok(indicators)
}

/// Run the full pipeline over one ticker's bars.
pub fn run_ticker(
    code: &str,
    ohlcv: &[OhlcvBar],
    strategy: &Strategy,
    cache: Option<&IndicatorCache>,
) -> Result<TickerReport, BarsignalError> {
    let indicators = prepare(code, ohlcv, strategy, cache)?;
    let result = walk(strategy, ohlcv, &indicators);
    let metrics = PerformanceMetrics::compute(ohlcv, &result.held, &result.trades);

    debug!(
        code,
        bars = ohlcv.len(),
        trades = result.trades.len(),
        open = result.open_trade.is_some(),
        "ticker complete"
    );

    // prepare() rejects empty input
    let first_timestamp = ohlcv[0].timestamp;
    let last_timestamp = ohlcv[ohlcv.len() - 1].timestamp;

    Ok(TickerReport {
        code: code.to_string(),
        bars: ohlcv.len(),
        first_timestamp,
        last_timestamp,
        trades: result.trades,
        open_trade: result.open_trade,
        final_state: result.final_state,
        metrics,
    })
}

/// Per-bar entry and sell flags alongside the authoritative held mask.
///
/// The flags are informational. Positions open and close only in the walk.
pub fn signal_rows(
    code: &str,
    ohlcv: &[OhlcvBar],
    strategy: &Strategy,
) -> Result<Vec<SignalRow>, BarsignalError> {
    let indicators = prepare(code, ohlcv, strategy, None)?;
    let entries = evaluate_series(&strategy.entry, ohlcv, &indicators);
    let sells = evaluate_series(&strategy.sell, ohlcv, &indicators);
    let held = walk(strategy, ohlcv, &indicators).held;

    Ok(ohlcv
        .iter()
        .zip(entries)
        .zip(sells)
        .zip(held)
        .map(|(((bar, entry_signal), sell_signal), held)| SignalRow {
            timestamp: bar.timestamp,
            close: bar.close,
            entry_signal,
            sell_signal,
            held,
        })
        .collect())
}

fn fetch(
    data_port: &dyn DataPort,
    code: &str,
    config: &BacktestConfig,
) -> Result<Vec<OhlcvBar>, BarsignalError> {
    data_port
        .fetch_ohlcv(code, config.start_date, config.end_date)
        .map_err(|e| match e {
            BarsignalError::Provider { .. } => e,
            other => BarsignalError::Provider {
                code: code.to_string(),
                reason: other.to_string(),
            },
        })
}

/// Fetch and backtest every configured code.
pub fn run_batch(
    data_port: &dyn DataPort,
    strategy: &Strategy,
    config: &BacktestConfig,
    cache: Option<&IndicatorCache>,
) -> BatchReport {
    info!(
        codes = config.codes.len(),
        profile = %strategy.profile,
        parallel = config.parallel,
        start = %config.start_date,
        end = %config.end_date,
        "starting batch"
    );

    let fetched: Vec<(&String, Result<Vec<OhlcvBar>, BarsignalError>)> = if config.parallel {
        config
            .codes
            .par_iter()
            .map(|code| (code, fetch(data_port, code, config)))
            .collect()
    } else {
        config
            .codes
            .iter()
            .map(|code| (code, fetch(data_port, code, config)))
            .collect()
    };

    let process = |(code, bars): (&String, Result<Vec<OhlcvBar>, BarsignalError>)| {
        let outcome = bars.and_then(|bars| run_ticker(code, &bars, strategy, cache));
        outcome.map_err(|error| TickerFailure {
            code: code.clone(),
            error,
        })
    };

    let outcomes: Vec<Result<TickerReport, TickerFailure>> = if config.parallel {
        fetched.into_par_iter().map(process).collect()
    } else {
        fetched.into_iter().map(process).collect()
    };

    let mut batch = BatchReport::default();
    for outcome in outcomes {
        match outcome {
            Ok(report) => batch.reports.push(report),
            Err(failure) => {
                warn!(code = %failure.code, error = %failure.error, "skipping ticker");
                batch.failures.push(failure);
            }
        }
    }

    info!(
        completed = batch.reports.len(),
        failed = batch.failures.len(),
        "batch finished"
    );
    batch
}
