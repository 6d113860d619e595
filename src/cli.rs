//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_batch, signal_rows, BacktestConfig, BatchReport, TickerReport};
use crate::domain::cache::IndicatorCache;
use crate::domain::config_validation::{
    optional_bool, optional_f64, optional_usize, required_date, unknown_keys,
    validate_backtest_config, validate_date_range, validate_entry_rule,
    validate_strategy_config, BACKTEST_KEYS, STRATEGY_KEYS,
};
use crate::domain::error::BarsignalError;
use crate::domain::ohlcv::format_timestamp;
use crate::domain::strategy::{ExitPriority, Interval, Profile, Strategy};
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "barsignal", about = "Indicator signals and strategy backtests")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest every configured ticker
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated codes, replacing [backtest] codes
        #[arg(long)]
        codes: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        profile: Option<String>,
        /// Run tickers one at a time
        #[arg(long)]
        sequential: bool,
    },
    /// Print the per-bar entry and sell flags and the held mask for one ticker
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: String,
        #[arg(long)]
        profile: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the built-in strategy profiles
    Profiles,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            codes,
            data_dir,
            profile,
            sequential,
        } => run_backtest(
            &config,
            codes.as_deref(),
            data_dir,
            profile.as_deref(),
            sequential,
        ),
        Command::Signals {
            config,
            code,
            profile,
        } => run_signals(&config, &code, profile.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Profiles => run_profiles(),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, BarsignalError> {
    FileConfigAdapter::from_file(path).map_err(|e| BarsignalError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn fail(err: BarsignalError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

fn warn_unknown_keys(adapter: &dyn ConfigPort, section: &str, known: &[&str]) {
    for key in unknown_keys(adapter, section, known) {
        warn!(section, key = %key, "ignoring unknown config key");
    }
}

pub fn build_backtest_config(
    adapter: &dyn ConfigPort,
    codes_override: Option<&str>,
    data_dir_override: Option<PathBuf>,
    sequential: bool,
) -> Result<BacktestConfig, BarsignalError> {
    warn_unknown_keys(adapter, "backtest", BACKTEST_KEYS);
    let start_date = required_date(adapter, "backtest", "start_date")?;
    let end_date = required_date(adapter, "backtest", "end_date")?;
    validate_date_range(start_date, end_date)?;

    let codes_str = match codes_override {
        Some(c) => c.to_string(),
        None => adapter
            .get_string("backtest", "codes")
            .ok_or_else(|| BarsignalError::ConfigMissing {
                section: "backtest".into(),
                key: "codes".into(),
            })?,
    };
    let codes = parse_codes(&codes_str).map_err(|e| BarsignalError::ConfigInvalid {
        section: "backtest".into(),
        key: "codes".into(),
        reason: e.to_string(),
    })?;

    let data_dir = data_dir_override
        .or_else(|| adapter.get_string("backtest", "data_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data"));

    Ok(BacktestConfig {
        codes,
        start_date,
        end_date,
        data_dir,
        parallel: !sequential && optional_bool(adapter, "backtest", "parallel")?.unwrap_or(true),
        cache: optional_bool(adapter, "backtest", "cache")?.unwrap_or(false),
    })
}

/// Layer interval windows, profile defaults and `[strategy]` overrides.
pub fn build_strategy(
    adapter: &dyn ConfigPort,
    profile_override: Option<&str>,
) -> Result<Strategy, BarsignalError> {
    warn_unknown_keys(adapter, "strategy", STRATEGY_KEYS);
    let profile_name = profile_override
        .map(str::to_string)
        .or_else(|| adapter.get_string("strategy", "profile"))
        .unwrap_or_else(|| Profile::TrendMomentum.name().to_string());
    let profile = Profile::parse(&profile_name).ok_or_else(|| BarsignalError::ConfigInvalid {
        section: "strategy".into(),
        key: "profile".into(),
        reason: format!("unknown profile {:?}", profile_name),
    })?;

    let interval = match adapter.get_string("strategy", "interval") {
        Some(raw) => Interval::parse(&raw).ok_or_else(|| BarsignalError::ConfigInvalid {
            section: "strategy".into(),
            key: "interval".into(),
            reason: format!("unknown interval {:?}", raw),
        })?,
        None => Interval::OneDay,
    };

    let mut config = profile.defaults(interval);

    let windows: [(&str, &mut usize); 12] = [
        ("fast_window", &mut config.fast_window),
        ("slow_window", &mut config.slow_window),
        ("trend_fast_window", &mut config.trend_fast_window),
        ("trend_slow_window", &mut config.trend_slow_window),
        ("pullback_fast_window", &mut config.pullback_fast_window),
        ("pullback_slow_window", &mut config.pullback_slow_window),
        ("rsi_window", &mut config.rsi_window),
        ("bollinger_window", &mut config.bollinger_window),
        ("volume_window", &mut config.volume_window),
        ("macd_fast", &mut config.macd_fast),
        ("macd_slow", &mut config.macd_slow),
        ("macd_signal", &mut config.macd_signal),
    ];
    for (key, slot) in windows {
        if let Some(v) = optional_usize(adapter, "strategy", key)? {
            *slot = v;
        }
    }

    let thresholds: [(&str, &mut f64); 6] = [
        ("rsi_entry_threshold", &mut config.rsi_entry_threshold),
        ("rsi_exit_threshold", &mut config.rsi_exit_threshold),
        ("bollinger_k", &mut config.bollinger_k),
        ("stop_loss_pct", &mut config.stop_loss_pct),
        ("profit_target_pct", &mut config.profit_target_pct),
        ("volume_multiplier", &mut config.volume_multiplier),
    ];
    for (key, slot) in thresholds {
        if let Some(v) = optional_f64(adapter, "strategy", key)? {
            *slot = v;
        }
    }

    if let Some(n) = optional_usize(adapter, "strategy", "max_holding_bars")? {
        config.max_holding_bars = (n > 0).then_some(n);
    }

    if let Some(raw) = adapter.get_string("strategy", "exit_priority") {
        config.exit_priority =
            ExitPriority::parse(&raw).ok_or_else(|| BarsignalError::ConfigInvalid {
                section: "strategy".into(),
                key: "exit_priority".into(),
                reason: format!("unknown exit priority {:?}", raw),
            })?;
    }

    validate_strategy_config(&config)?;
    let strategy = Strategy::from_profile(profile, config);
    validate_entry_rule(&strategy)?;
    Ok(strategy)
}

fn run_backtest(
    config_path: &Path,
    codes_override: Option<&str>,
    data_dir_override: Option<PathBuf>,
    profile_override: Option<&str>,
    sequential: bool,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };
    let bt_config =
        match build_backtest_config(&adapter, codes_override, data_dir_override, sequential) {
            Ok(c) => c,
            Err(e) => return fail(e),
        };
    let strategy = match build_strategy(&adapter, profile_override) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let data_port = CsvAdapter::new(bt_config.data_dir.clone());
    run_backtest_pipeline(&data_port, &strategy, &bt_config)
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    strategy: &Strategy,
    bt_config: &BacktestConfig,
) -> ExitCode {
    let cache = bt_config.cache.then(IndicatorCache::new);
    let batch = run_batch(data_port, strategy, bt_config, cache.as_ref());

    if let Some(cache) = &cache {
        info!(hits = cache.hits(), misses = cache.misses(), "indicator cache");
    }

    print!("{}", format_batch(strategy, &batch));

    for failure in &batch.failures {
        eprintln!("skipped {}: {}", failure.code, failure.error);
    }

    if batch.reports.is_empty() {
        if let Some(first) = batch.failures.first() {
            return ExitCode::from(&first.error);
        }
    }
    ExitCode::SUCCESS
}

/// Result table printed to stdout after a batch.
pub fn format_batch(strategy: &Strategy, batch: &BatchReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Profile: {} ({})\n",
        strategy.profile, strategy.config.interval
    ));
    out.push_str(&format!(
        "{:<10} {:>6} {:>7} {:>10} {:>10} {:>22} {:>9} {:>8}\n",
        "CODE", "BARS", "TRADES", "STRATEGY", "MARKET", "SHARPE", "WIN RATE", "OPEN"
    ));
    for report in &batch.reports {
        out.push_str(&format_row(report));
    }
    out
}

fn format_row(report: &TickerReport) -> String {
    let m = &report.metrics;
    let open = match &report.open_trade {
        Some(open) => format!("@{:.2}", open.entry_price),
        None => "-".to_string(),
    };
    format!(
        "{:<10} {:>6} {:>7} {:>9.2}% {:>9.2}% {:>22} {:>8.1}% {:>8}\n",
        report.code,
        report.bars,
        m.closed_trades,
        m.total_return * 100.0,
        m.market_return * 100.0,
        m.sharpe_display().to_string(),
        m.win_rate * 100.0,
        open
    )
}

fn run_signals(config_path: &Path, code: &str, profile_override: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };
    let bt_config = match build_backtest_config(&adapter, Some(code), None, true) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let strategy = match build_strategy(&adapter, profile_override) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let data_port = CsvAdapter::new(bt_config.data_dir.clone());
    let code = &bt_config.codes[0];
    let bars = match data_port.fetch_ohlcv(code, bt_config.start_date, bt_config.end_date) {
        Ok(b) => b,
        Err(e) => return fail(e),
    };
    let rows = match signal_rows(code, &bars, &strategy) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    println!("date,close,entry_signal,sell_signal,held");
    for row in &rows {
        println!(
            "{},{:.4},{},{},{}",
            format_timestamp(row.timestamp),
            row.close,
            row.entry_signal as u8,
            row.sell_signal as u8,
            row.held as u8
        );
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        return fail(e);
    }
    let strategy = match build_strategy(&adapter, None) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let c = &strategy.config;
    println!("profile:        {}", strategy.profile);
    println!("interval:       {}", c.interval);
    println!("entry rule:     {}", strategy.entry);
    println!("sell flag:      {}", strategy.sell);
    println!(
        "exits:          stop {:.2}%, target {:.2}%, RSI > {}, {}",
        c.stop_loss_pct * 100.0,
        c.profit_target_pct * 100.0,
        c.rsi_exit_threshold,
        c.exit_priority.as_str()
    );
    match c.max_holding_bars {
        Some(n) => println!("time exit:      {} bars", n),
        None => println!("time exit:      off"),
    }
    let indicators: Vec<String> = strategy
        .required_indicators()
        .iter()
        .map(|i| i.to_string())
        .collect();
    println!("indicators:     {}", indicators.join(", "));
    println!("minimum bars:   {}", strategy.min_bars());
    for (section, known) in [("backtest", BACKTEST_KEYS), ("strategy", STRATEGY_KEYS)] {
        for key in unknown_keys(&adapter, section, known) {
            println!("unknown key:    [{}] {}", section, key);
        }
    }

    eprintln!("Configuration is valid.");
    ExitCode::SUCCESS
}

fn run_profiles() -> ExitCode {
    for profile in Profile::ALL {
        println!("{:<16} {}", profile.name(), profile.description());
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::IndicatorType;

    fn adapter(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const BASE: &str = "[backtest]\ncodes = aapl, msft\nstart_date = 2020-01-01\nend_date = 2024-12-31\n";

    #[test]
    fn backtest_config_defaults() {
        let c = build_backtest_config(&adapter(BASE), None, None, false).unwrap();
        assert_eq!(c.codes, vec!["AAPL", "MSFT"]);
        assert_eq!(c.data_dir, PathBuf::from("data"));
        assert!(c.parallel);
        assert!(!c.cache);
    }

    #[test]
    fn backtest_config_overrides() {
        let c = build_backtest_config(
            &adapter(BASE),
            Some("nvda"),
            Some(PathBuf::from("/tmp/bars")),
            true,
        )
        .unwrap();
        assert_eq!(c.codes, vec!["NVDA"]);
        assert_eq!(c.data_dir, PathBuf::from("/tmp/bars"));
        assert!(!c.parallel);
    }

    #[test]
    fn backtest_config_missing_codes() {
        let err = build_backtest_config(
            &adapter("[backtest]\nstart_date = 2020-01-01\nend_date = 2024-12-31\n"),
            None,
            None,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, BarsignalError::ConfigMissing { key, .. } if key == "codes"));
    }

    #[test]
    fn strategy_defaults_to_trend_momentum() {
        let s = build_strategy(&adapter(BASE), None).unwrap();
        assert_eq!(s.profile, Profile::TrendMomentum);
        assert_eq!(s.config.rsi_entry_threshold, 50.0);
    }

    #[test]
    fn strategy_overrides_layer_over_profile() {
        let s = build_strategy(
            &adapter(
                "[strategy]\nprofile = swing_time_exit\ninterval = 1h\nrsi_window = 10\nstop_loss_pct = 0.03\nmax_holding_bars = 0\n",
            ),
            None,
        )
        .unwrap();
        assert_eq!(s.profile, Profile::SwingTimeExit);
        assert_eq!(s.config.interval, Interval::OneHour);
        assert_eq!(s.config.rsi_window, 10);
        assert_eq!(s.config.stop_loss_pct, 0.03);
        assert_eq!(s.config.max_holding_bars, None);
        assert_eq!(s.config.exit_priority, ExitPriority::ProfitTargetFirst);
        assert!(s.required_indicators().contains(&IndicatorType::Rsi(10)));
    }

    #[test]
    fn profile_flag_beats_config() {
        let s = build_strategy(
            &adapter("[strategy]\nprofile = mean_reversion\n"),
            Some("candle_breakout"),
        )
        .unwrap();
        assert_eq!(s.profile, Profile::CandleBreakout);
    }

    #[test]
    fn unknown_profile_is_config_error() {
        let err = build_strategy(&adapter("[strategy]\nprofile = yolo\n"), None).unwrap_err();
        assert!(matches!(err, BarsignalError::ConfigInvalid { key, .. } if key == "profile"));
    }

    #[test]
    fn malformed_number_is_config_error() {
        let err = build_strategy(&adapter("[strategy]\nbollinger_k = wide\n"), None).unwrap_err();
        assert!(matches!(err, BarsignalError::ConfigInvalid { key, .. } if key == "bollinger_k"));
    }

    #[test]
    fn out_of_range_override_rejected() {
        let err =
            build_strategy(&adapter("[strategy]\nfast_window = 30\n"), None).unwrap_err();
        assert!(matches!(err, BarsignalError::ConfigInvalid { key, .. } if key == "fast_window"));
    }

    #[test]
    fn backtest_config_rejects_reversed_dates() {
        let err = build_backtest_config(
            &adapter("[backtest]\ncodes = AAPL\nstart_date = 2024-06-01\nend_date = 2024-01-01\n"),
            None,
            None,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, BarsignalError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn backtest_config_reads_flags() {
        let c = build_backtest_config(
            &adapter(&format!("{BASE}parallel = false\ncache = yes\n")),
            None,
            None,
            false,
        )
        .unwrap();
        assert!(!c.parallel);
        assert!(c.cache);

        let err = build_backtest_config(
            &adapter(&format!("{BASE}cache = sometimes\n")),
            None,
            None,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, BarsignalError::ConfigInvalid { key, .. } if key == "cache"));
    }

    #[test]
    fn pullback_windows_are_configurable() {
        let s = build_strategy(
            &adapter(
                "[strategy]\nprofile = macd_pullback\ninterval = 5m\npullback_fast_window = 12\npullback_slow_window = 40\n",
            ),
            None,
        )
        .unwrap();
        assert!(s.required_indicators().contains(&IndicatorType::Sma(12)));
        assert!(s.required_indicators().contains(&IndicatorType::Sma(40)));

        let err = build_strategy(
            &adapter("[strategy]\npullback_fast_window = 50\npullback_slow_window = 20\n"),
            None,
        )
        .unwrap_err();
        assert!(
            matches!(err, BarsignalError::ConfigInvalid { key, .. } if key == "pullback_fast_window")
        );
    }

    #[test]
    fn unknown_keys_do_not_fail_the_build() {
        let s = build_strategy(&adapter("[strategy]\nprofile = mean_reversion\nrsi_windw = 3\n"), None)
            .unwrap();
        assert_eq!(s.config.rsi_window, 14);
    }
}
