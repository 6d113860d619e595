//! Strategy configuration and composition.
//!
//! A strategy is a named [`Profile`] plus a [`StrategyConfig`]. Parameters are
//! layered: interval windows first, then the profile's defaults, then any
//! explicit overrides from the config file.

use crate::domain::indicator::bollinger::mult_to_x100;
use crate::domain::indicator::macd;
use crate::domain::indicator::IndicatorType;
use crate::domain::rule::{extract_indicators, IndicatorField, Operand, Rule};
use std::fmt;

/// Bar sampling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    OneDay,
    OneHour,
    ThirtyMinutes,
    FifteenMinutes,
    FiveMinutes,
}

/// Indicator windows for one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalWindows {
    pub fast: usize,
    pub slow: usize,
    pub trend_fast: usize,
    pub trend_slow: usize,
    pub pullback_fast: usize,
    pub pullback_slow: usize,
    pub rsi: usize,
    pub bollinger: usize,
    pub volume: usize,
}

impl Interval {
    pub const ALL: [Interval; 5] = [
        Interval::OneDay,
        Interval::OneHour,
        Interval::ThirtyMinutes,
        Interval::FifteenMinutes,
        Interval::FiveMinutes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneDay => "1d",
            Interval::OneHour => "1h",
            Interval::ThirtyMinutes => "30m",
            Interval::FifteenMinutes => "15m",
            Interval::FiveMinutes => "5m",
        }
    }

    pub fn parse(s: &str) -> Option<Interval> {
        let s = s.trim().to_ascii_lowercase();
        Interval::ALL.into_iter().find(|i| i.as_str() == s)
    }

    pub fn windows(&self) -> IntervalWindows {
        match self {
            Interval::OneDay => IntervalWindows {
                fast: 5,
                slow: 20,
                trend_fast: 50,
                trend_slow: 200,
                pullback_fast: 20,
                pullback_slow: 50,
                rsi: 14,
                bollinger: 20,
                volume: 20,
            },
            Interval::OneHour => IntervalWindows {
                fast: 5,
                slow: 20,
                trend_fast: 20,
                trend_slow: 50,
                pullback_fast: 20,
                pullback_slow: 50,
                rsi: 14,
                bollinger: 20,
                volume: 20,
            },
            Interval::ThirtyMinutes | Interval::FifteenMinutes | Interval::FiveMinutes => {
                IntervalWindows {
                    fast: 3,
                    slow: 10,
                    trend_fast: 10,
                    trend_slow: 30,
                    pullback_fast: 10,
                    pullback_slow: 30,
                    rsi: 9,
                    bollinger: 14,
                    volume: 10,
                }
            }
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order in which the two price exits are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPriority {
    StopLossFirst,
    ProfitTargetFirst,
}

impl ExitPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitPriority::StopLossFirst => "stop_loss_first",
            ExitPriority::ProfitTargetFirst => "profit_target_first",
        }
    }

    pub fn parse(s: &str) -> Option<ExitPriority> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop_loss_first" => Some(ExitPriority::StopLossFirst),
            "profit_target_first" => Some(ExitPriority::ProfitTargetFirst),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub interval: Interval,
    pub fast_window: usize,
    pub slow_window: usize,
    pub trend_fast_window: usize,
    pub trend_slow_window: usize,
    pub pullback_fast_window: usize,
    pub pullback_slow_window: usize,
    pub rsi_window: usize,
    pub rsi_entry_threshold: f64,
    pub rsi_exit_threshold: f64,
    pub bollinger_window: usize,
    pub bollinger_k: f64,
    pub stop_loss_pct: f64,
    pub profit_target_pct: f64,
    pub max_holding_bars: Option<usize>,
    pub volume_multiplier: f64,
    pub volume_window: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub exit_priority: ExitPriority,
}

impl StrategyConfig {
    pub fn for_interval(interval: Interval) -> Self {
        let w = interval.windows();
        Self {
            interval,
            fast_window: w.fast,
            slow_window: w.slow,
            trend_fast_window: w.trend_fast,
            trend_slow_window: w.trend_slow,
            pullback_fast_window: w.pullback_fast,
            pullback_slow_window: w.pullback_slow,
            rsi_window: w.rsi,
            rsi_entry_threshold: 50.0,
            rsi_exit_threshold: 70.0,
            bollinger_window: w.bollinger,
            bollinger_k: 2.0,
            stop_loss_pct: 0.02,
            profit_target_pct: 0.05,
            max_holding_bars: None,
            volume_multiplier: 1.5,
            volume_window: w.volume,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            exit_priority: ExitPriority::StopLossFirst,
        }
    }

    pub fn rsi(&self) -> IndicatorType {
        IndicatorType::Rsi(self.rsi_window)
    }

    pub fn macd(&self) -> IndicatorType {
        IndicatorType::Macd {
            fast: self.macd_fast,
            slow: self.macd_slow,
            signal: self.macd_signal,
        }
    }

    pub fn bollinger(&self) -> IndicatorType {
        IndicatorType::Bollinger {
            period: self.bollinger_window,
            stddev_mult_x100: mult_to_x100(self.bollinger_k),
        }
    }

    /// Sell flag: close above the upper Bollinger band, or RSI overbought.
    pub fn sell_rule(&self) -> Rule {
        Rule::Or(vec![
            Rule::Above {
                left: Operand::Close,
                right: Operand::field(self.bollinger(), IndicatorField::BollingerUpper),
            },
            Rule::Above {
                left: Operand::value(self.rsi()),
                right: Operand::Constant(self.rsi_exit_threshold),
            },
        ])
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::for_interval(Interval::OneDay)
    }
}

/// Named strategy variants, each with its own entry rule and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    TrendMomentum,
    MeanReversion,
    CandleBreakout,
    MacdPullback,
    SwingTimeExit,
}

impl Profile {
    pub const ALL: [Profile; 5] = [
        Profile::TrendMomentum,
        Profile::MeanReversion,
        Profile::CandleBreakout,
        Profile::MacdPullback,
        Profile::SwingTimeExit,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Profile::TrendMomentum => "trend_momentum",
            Profile::MeanReversion => "mean_reversion",
            Profile::CandleBreakout => "candle_breakout",
            Profile::MacdPullback => "macd_pullback",
            Profile::SwingTimeExit => "swing_time_exit",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Profile::TrendMomentum => {
                "rising close, fast/slow and trend SMAs aligned, MACD cross, volume surge, RSI < 50"
            }
            Profile::MeanReversion => {
                "trend SMAs aligned, MACD above signal, RSI < 70, close below lower Bollinger band"
            }
            Profile::CandleBreakout => {
                "bullish candle engulfing the last bearish body, RSI < 58, fast EMA crossed slow EMA within 2 bars"
            }
            Profile::MacdPullback => {
                "pullback fast SMA above pullback slow SMA, MACD above signal, RSI < 55, volume above average"
            }
            Profile::SwingTimeExit => {
                "fast SMA above slow SMA, MACD cross, RSI < 60, exit after 5 bars, profit target first"
            }
        }
    }

    pub fn parse(s: &str) -> Option<Profile> {
        let s = s.trim().to_ascii_lowercase();
        Profile::ALL.into_iter().find(|p| p.name() == s)
    }

    /// Interval windows with this profile's thresholds and exit policy applied.
    pub fn defaults(&self, interval: Interval) -> StrategyConfig {
        let mut config = StrategyConfig::for_interval(interval);
        match self {
            Profile::TrendMomentum => {
                config.rsi_entry_threshold = 50.0;
                config.volume_multiplier = 1.5;
            }
            Profile::MeanReversion => {
                config.rsi_entry_threshold = 70.0;
            }
            Profile::CandleBreakout => {
                config.rsi_entry_threshold = 58.0;
            }
            Profile::MacdPullback => {
                config.rsi_entry_threshold = 55.0;
                config.volume_multiplier = 1.0;
            }
            Profile::SwingTimeExit => {
                config.rsi_entry_threshold = 60.0;
                config.max_holding_bars = Some(5);
                config.exit_priority = ExitPriority::ProfitTargetFirst;
            }
        }
        config
    }

    pub fn entry_rule(&self, config: &StrategyConfig) -> Rule {
        let sma = |w: usize| Operand::value(IndicatorType::Sma(w));
        let ema = |w: usize| Operand::value(IndicatorType::Ema(w));
        let macd_line = Operand::field(config.macd(), IndicatorField::MacdLine);
        let macd_signal = Operand::field(config.macd(), IndicatorField::MacdSignal);
        let rsi_below = Rule::Below {
            left: Operand::value(config.rsi()),
            right: Operand::Constant(config.rsi_entry_threshold),
        };
        let volume_confirmed = Rule::Above {
            left: Operand::Volume,
            right: Operand::value(IndicatorType::VolumeSma(config.volume_window))
                .scaled(config.volume_multiplier),
        };

        match self {
            Profile::TrendMomentum => Rule::And(vec![
                Rule::Above {
                    left: Operand::Close,
                    right: Operand::Close.previous(),
                },
                Rule::Above {
                    left: sma(config.fast_window),
                    right: sma(config.slow_window),
                },
                Rule::Above {
                    left: sma(config.trend_fast_window),
                    right: sma(config.trend_slow_window),
                },
                Rule::CrossAbove {
                    left: macd_line,
                    right: macd_signal,
                },
                volume_confirmed,
                rsi_below,
            ]),
            Profile::MeanReversion => Rule::And(vec![
                Rule::Above {
                    left: sma(config.trend_fast_window),
                    right: sma(config.trend_slow_window),
                },
                Rule::Above {
                    left: macd_line,
                    right: macd_signal,
                },
                rsi_below,
                Rule::Below {
                    left: Operand::Close,
                    right: Operand::field(config.bollinger(), IndicatorField::BollingerLower),
                },
            ]),
            Profile::CandleBreakout => Rule::And(vec![
                Rule::BullishEngulfsLastBearish,
                rsi_below,
                Rule::AnyOf {
                    rule: Box::new(Rule::CrossAbove {
                        left: ema(config.fast_window),
                        right: ema(config.slow_window),
                    }),
                    count: 2,
                },
            ]),
            Profile::MacdPullback => Rule::And(vec![
                Rule::Above {
                    left: sma(config.pullback_fast_window),
                    right: sma(config.pullback_slow_window),
                },
                Rule::Above {
                    left: macd_line,
                    right: macd_signal,
                },
                rsi_below,
                volume_confirmed,
            ]),
            Profile::SwingTimeExit => Rule::And(vec![
                Rule::Above {
                    left: sma(config.fast_window),
                    right: sma(config.slow_window),
                },
                Rule::CrossAbove {
                    left: macd_line,
                    right: macd_signal,
                },
                rsi_below,
            ]),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct Strategy {
    pub profile: Profile,
    pub config: StrategyConfig,
    pub entry: Rule,
    pub sell: Rule,
}

impl Strategy {
    pub fn from_profile(profile: Profile, config: StrategyConfig) -> Self {
        let entry = profile.entry_rule(&config);
        let sell = config.sell_rule();
        Self {
            profile,
            config,
            entry,
            sell,
        }
    }

    /// Indicators read by the entry rule and the sell flag.
    ///
    /// The sell flag carries the RSI used by the overbought exit.
    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        let mut indicators = extract_indicators(&self.entry);
        for indicator in extract_indicators(&self.sell) {
            if !indicators.contains(&indicator) {
                indicators.push(indicator);
            }
        }
        indicators
    }

    /// Bars needed before signals are evaluated: largest window plus one.
    pub fn min_bars(&self) -> usize {
        let largest = self
            .required_indicators()
            .iter()
            .map(IndicatorType::window)
            .max()
            .unwrap_or(0);
        largest.max(self.entry.lookback()).max(self.sell.lookback()) + 1
    }
}
