//! Position state and trade records.

use crate::domain::strategy::{ExitPriority, StrategyConfig};
use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionState {
    Flat,
    Long {
        entry_bar: usize,
        entry_time: NaiveDateTime,
        entry_price: f64,
    },
}

impl PositionState {
    pub fn is_long(&self) -> bool {
        matches!(self, PositionState::Long { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    StopLoss,
    ProfitTarget,
    Overbought,
    TimeExit,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::ProfitTarget => "profit_target",
            ExitReason::Overbought => "overbought",
            ExitReason::TimeExit => "time_exit",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_bar: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    pub return_pct: f64,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.return_pct > 0.0
    }

    pub fn holding_bars(&self) -> usize {
        self.exit_bar - self.entry_bar
    }
}

/// A position still long when the bars run out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenTrade {
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
}

impl OpenTrade {
    pub fn unrealized_pct(&self, price: f64) -> f64 {
        return_pct(self.entry_price, price)
    }
}

pub fn return_pct(entry_price: f64, exit_price: f64) -> f64 {
    (exit_price / entry_price - 1.0) * 100.0
}

/// First exit condition that fires for a long position at `bar_index`.
///
/// `rsi` is NaN during warm-up, which never trips the overbought exit.
pub fn check_exit(
    config: &StrategyConfig,
    entry_bar: usize,
    entry_price: f64,
    bar_index: usize,
    close: f64,
    rsi: f64,
) -> Option<ExitReason> {
    let stop = close <= entry_price * (1.0 - config.stop_loss_pct);
    let target = close >= entry_price * (1.0 + config.profit_target_pct);

    let price_exits = match config.exit_priority {
        ExitPriority::StopLossFirst => [
            (stop, ExitReason::StopLoss),
            (target, ExitReason::ProfitTarget),
        ],
        ExitPriority::ProfitTargetFirst => [
            (target, ExitReason::ProfitTarget),
            (stop, ExitReason::StopLoss),
        ],
    };
    if let Some((_, reason)) = price_exits.into_iter().find(|(hit, _)| *hit) {
        return Some(reason);
    }

    if rsi > config.rsi_exit_threshold {
        return Some(ExitReason::Overbought);
    }

    match config.max_holding_bars {
        Some(n) if bar_index - entry_bar >= n => Some(ExitReason::TimeExit),
        _ => None,
    }
}
