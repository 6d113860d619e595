//! Performance metrics and statistics.
//!
//! Per-bar market return `r[i] = C[i]/C[i-1] - 1` with `r[0] = 0`. The strategy
//! earns `r[i]` only when the position was held at the close of bar `i-1`.

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::position::Trade;
use std::fmt;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub market_return: f64,
    /// NaN when the strategy returns have no variance.
    pub sharpe_ratio: f64,
    pub win_rate: f64,
    pub closed_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub avg_trade_return_pct: f64,
    pub best_trade_pct: f64,
    pub worst_trade_pct: f64,
    pub exposure: f64,
    pub max_drawdown: f64,
    pub strategy_curve: Vec<f64>,
    pub market_curve: Vec<f64>,
}

impl PerformanceMetrics {
    pub fn compute(ohlcv: &[OhlcvBar], held: &[bool], trades: &[Trade]) -> Self {
        let market = market_returns(ohlcv);
        let strategy = strategy_returns(&market, held);

        let market_curve = cumulative_curve(&market);
        let strategy_curve = cumulative_curve(&strategy);

        let total_return = strategy_curve.last().copied().unwrap_or(0.0);
        let market_return = market_curve.last().copied().unwrap_or(0.0);

        let sharpe_ratio = sharpe_ratio(strategy.get(1..).unwrap_or(&[]));

        let closed_trades = trades.len();
        let winning_trades = trades.iter().filter(|t| t.is_winner()).count();
        let losing_trades = trades.iter().filter(|t| t.return_pct < 0.0).count();
        let win_rate = win_rate(trades);

        let (avg_trade_return_pct, best_trade_pct, worst_trade_pct) = if trades.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let returns = trades.iter().map(|t| t.return_pct);
            (
                returns.clone().sum::<f64>() / closed_trades as f64,
                returns.clone().fold(f64::NEG_INFINITY, f64::max),
                returns.fold(f64::INFINITY, f64::min),
            )
        };

        let exposure = if held.is_empty() {
            0.0
        } else {
            held.iter().filter(|h| **h).count() as f64 / held.len() as f64
        };

        PerformanceMetrics {
            total_return,
            market_return,
            sharpe_ratio,
            win_rate,
            closed_trades,
            winning_trades,
            losing_trades,
            avg_trade_return_pct,
            best_trade_pct,
            worst_trade_pct,
            exposure,
            max_drawdown: max_drawdown(&strategy_curve),
            strategy_curve,
            market_curve,
        }
    }

    pub fn sharpe_display(&self) -> SharpeDisplay {
        SharpeDisplay(self.sharpe_ratio)
    }
}

/// Formats a Sharpe ratio, printing "insufficient variance" for NaN.
#[derive(Debug, Clone, Copy)]
pub struct SharpeDisplay(pub f64);

impl fmt::Display for SharpeDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_nan() {
            f.write_str("insufficient variance")
        } else {
            write!(f, "{:.2}", self.0)
        }
    }
}

pub fn market_returns(ohlcv: &[OhlcvBar]) -> Vec<f64> {
    let mut returns = Vec::with_capacity(ohlcv.len());
    if !ohlcv.is_empty() {
        returns.push(0.0);
    }
    returns.extend(ohlcv.windows(2).map(|w| w[1].close / w[0].close - 1.0));
    returns
}

pub fn strategy_returns(market: &[f64], held: &[bool]) -> Vec<f64> {
    market
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let was_held = i > 0 && held.get(i - 1).copied().unwrap_or(false);
            if was_held { *r } else { 0.0 }
        })
        .collect()
}

/// Running `prod(1 + r) - 1`.
pub fn cumulative_curve(returns: &[f64]) -> Vec<f64> {
    let mut growth = 1.0;
    returns
        .iter()
        .map(|r| {
            growth *= 1.0 + r;
            growth - 1.0
        })
        .collect()
}

/// Annualized Sharpe ratio using the sample standard deviation.
///
/// NaN with fewer than two returns or zero variance.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return f64::NAN;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    if std_dev == 0.0 || !std_dev.is_finite() {
        return f64::NAN;
    }
    TRADING_DAYS_PER_YEAR.sqrt() * mean / std_dev
}

pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Largest peak-to-trough fall of the equity curve, as a positive fraction.
fn max_drawdown(curve: &[f64]) -> f64 {
    let mut peak = 1.0_f64;
    let mut max_dd = 0.0_f64;
    for c in curve {
        let equity = 1.0 + c;
        if equity > peak {
            peak = equity;
        }
        if peak > 0.0 {
            let dd = (peak - equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::ExitReason;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn bars(closes: &[f64]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| OhlcvBar {
                code: "TEST".into(),
                timestamp: start + Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1000,
            })
            .collect()
    }

    fn make_trade(return_pct: f64) -> Trade {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Trade {
            entry_bar: 0,
            entry_time: date,
            entry_price: 100.0,
            exit_bar: 1,
            exit_time: date + Duration::days(1),
            exit_price: 100.0 * (1.0 + return_pct / 100.0),
            exit_reason: ExitReason::ProfitTarget,
            return_pct,
        }
    }

    #[test]
    fn market_returns_start_at_zero() {
        let r = market_returns(&bars(&[100.0, 110.0, 99.0]));
        assert_eq!(r[0], 0.0);
        assert_relative_eq!(r[1], 0.1, epsilon = 1e-12);
        assert_relative_eq!(r[2], -0.1, epsilon = 1e-12);
        assert!(market_returns(&[]).is_empty());
    }

    #[test]
    fn strategy_returns_lag_one_bar() {
        let market = vec![0.0, 0.1, 0.2, 0.3];
        let held = vec![true, false, true, true];
        assert_eq!(strategy_returns(&market, &held), vec![0.0, 0.1, 0.0, 0.3]);
    }

    #[test]
    fn cumulative_compounds() {
        let curve = cumulative_curve(&[0.1, 0.1]);
        assert_relative_eq!(curve[1], 0.21, epsilon = 1e-12);
    }

    #[test]
    fn win_rate_half() {
        let trades = vec![make_trade(2.0), make_trade(-1.0)];
        assert_eq!(win_rate(&trades), 0.5);
    }

    #[test]
    fn win_rate_no_trades_is_zero() {
        assert_eq!(win_rate(&[]), 0.0);
    }

    #[test]
    fn sharpe_zero_variance_is_nan() {
        assert!(sharpe_ratio(&[0.0, 0.0, 0.0]).is_nan());
        assert!(sharpe_ratio(&[0.01]).is_nan());
        assert!(sharpe_ratio(&[]).is_nan());
    }

    #[test]
    fn sharpe_known_value() {
        // mean 0.02, sample std 0.01
        let s = sharpe_ratio(&[0.01, 0.02, 0.03]);
        assert_relative_eq!(s, 252.0_f64.sqrt() * 2.0, epsilon = 1e-9);
    }

    #[test]
    fn sharpe_display_text() {
        assert_eq!(SharpeDisplay(f64::NAN).to_string(), "insufficient variance");
        assert_eq!(SharpeDisplay(1.234).to_string(), "1.23");
    }

    #[test]
    fn max_drawdown_from_peak() {
        // equity 1.0 → 1.2 → 0.9 → 1.1
        let dd = max_drawdown(&[0.2, -0.1, 0.1]);
        assert_relative_eq!(dd, 0.25, epsilon = 1e-12);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn compute_flat_strategy() {
        let ohlcv = bars(&[100.0, 101.0, 102.0, 103.0]);
        let m = PerformanceMetrics::compute(&ohlcv, &[false; 4], &[]);
        assert_eq!(m.total_return, 0.0);
        assert_relative_eq!(m.market_return, 0.03, epsilon = 1e-12);
        assert!(m.sharpe_ratio.is_nan());
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.exposure, 0.0);
        assert_eq!(m.sharpe_display().to_string(), "insufficient variance");
    }

    #[test]
    fn compute_held_strategy_matches_market_after_entry() {
        let ohlcv = bars(&[100.0, 110.0, 121.0]);
        let m = PerformanceMetrics::compute(&ohlcv, &[true, true, true], &[]);
        assert_relative_eq!(m.total_return, m.market_return, epsilon = 1e-12);
        assert_relative_eq!(m.total_return, 0.21, epsilon = 1e-12);
        assert_eq!(m.exposure, 1.0);
    }

    #[test]
    fn compute_trade_statistics() {
        let trades = vec![make_trade(2.0), make_trade(-1.0), make_trade(5.0)];
        let m = PerformanceMetrics::compute(&bars(&[100.0, 100.0]), &[false, false], &trades);
        assert_eq!(m.closed_trades, 3);
        assert_eq!(m.winning_trades, 2);
        assert_eq!(m.losing_trades, 1);
        assert_relative_eq!(m.avg_trade_return_pct, 2.0, epsilon = 1e-12);
        assert_eq!(m.best_trade_pct, 5.0);
        assert_eq!(m.worst_trade_pct, -1.0);
    }
}
