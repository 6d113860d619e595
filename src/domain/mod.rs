//! Core domain types and logic.

pub mod backtest;
pub mod cache;
pub mod config_validation;
pub mod error;
pub mod execution;
pub mod indicator;
pub mod indicator_helpers;
pub mod metrics;
pub mod ohlcv;
pub mod position;
pub mod rule;
pub mod rule_eval;
pub mod strategy;
pub mod universe;
