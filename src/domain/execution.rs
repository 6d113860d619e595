//! Sequential bar walk for one ticker.
//!
//! The walk is the only place position transitions happen. Starting `Flat`,
//! each bar either opens a position (entry rule true), closes one (first
//! matching exit condition), or leaves the state unchanged. The entry bar is
//! never checked for an exit, and a bar that closes a position never opens a
//! new one.

use std::collections::HashMap;

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::position::{
    check_exit, return_pct, ExitReason, OpenTrade, PositionState, Trade,
};
use crate::domain::rule_eval::evaluate;
use crate::domain::strategy::Strategy;

#[derive(Debug, Clone, PartialEq)]
pub struct WalkResult {
    pub trades: Vec<Trade>,
    pub open_trade: Option<OpenTrade>,
    pub final_state: PositionState,
    /// `held[i]` is true when the position is long at the close of bar `i`.
    pub held: Vec<bool>,
}

pub fn walk(
    strategy: &Strategy,
    ohlcv: &[OhlcvBar],
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
) -> WalkResult {
    let rsi = strategy.config.rsi();
    walk_with(
        ohlcv,
        |i| evaluate(&strategy.entry, ohlcv, indicators, i),
        |entry_bar, entry_price, i| {
            let rsi_now = indicators
                .get(&rsi)
                .and_then(|s| s.simple_at(i))
                .unwrap_or(f64::NAN);
            check_exit(
                &strategy.config,
                entry_bar,
                entry_price,
                i,
                ohlcv[i].close,
                rsi_now,
            )
        },
    )
}

/// The walk with entry and exit decisions supplied by the caller.
pub fn walk_with<E, X>(ohlcv: &[OhlcvBar], mut entry: E, mut exit: X) -> WalkResult
where
    E: FnMut(usize) -> bool,
    X: FnMut(usize, f64, usize) -> Option<ExitReason>,
{
    let mut state = PositionState::Flat;
    let mut trades = Vec::new();
    let mut held = Vec::with_capacity(ohlcv.len());

    for (i, bar) in ohlcv.iter().enumerate() {
        state = match state {
            PositionState::Flat => {
                if entry(i) {
                    PositionState::Long {
                        entry_bar: i,
                        entry_time: bar.timestamp,
                        entry_price: bar.close,
                    }
                } else {
                    PositionState::Flat
                }
            }
            PositionState::Long {
                entry_bar,
                entry_time,
                entry_price,
            } => match exit(entry_bar, entry_price, i) {
                Some(reason) => {
                    trades.push(Trade {
                        entry_bar,
                        entry_time,
                        entry_price,
                        exit_bar: i,
                        exit_time: bar.timestamp,
                        exit_price: bar.close,
                        exit_reason: reason,
                        return_pct: return_pct(entry_price, bar.close),
                    });
                    PositionState::Flat
                }
                None => state,
            },
        };
        held.push(state.is_long());
    }

    let open_trade = match state {
        PositionState::Long {
            entry_bar,
            entry_time,
            entry_price,
        } => Some(OpenTrade {
            entry_bar,
            entry_time,
            entry_price,
        }),
        PositionState::Flat => None,
    };

    WalkResult {
        trades,
        open_trade,
        final_state: state,
        held,
    }
}
