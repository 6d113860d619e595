//! CLI integration tests for command orchestration.
//!
//! Tests cover:
//! - Config parsing from real INI files on disk (build_backtest_config, build_strategy)
//! - Profile and interval layering with `[strategy]` overrides
//! - Full pipeline with MockDataPort and with CSV files through CsvAdapter
//! - Exit codes for failed runs

mod common;

use barsignal::adapters::csv_adapter::CsvAdapter;
use barsignal::cli;
use barsignal::domain::backtest::run_batch;
use barsignal::domain::error::BarsignalError;
use barsignal::domain::indicator::IndicatorType;
use barsignal::domain::ohlcv::{format_timestamp, OhlcvBar};
use barsignal::domain::strategy::{ExitPriority, Interval, Profile};
use common::*;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

fn write_csv(path: &std::path::Path, bars: &[OhlcvBar]) {
    let mut csv = String::from("date,open,high,low,close,volume\n");
    // newest first to exercise sorting
    for bar in bars.iter().rev() {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            format_timestamp(bar.timestamp),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    std::fs::write(path, csv).unwrap();
}

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn same_exit(a: ExitCode, b: ExitCode) -> bool {
    format!("{:?}", a) == format!("{:?}", b)
}

const VALID_INI: &str = r#"
[backtest]
codes = bhp, cba, wbc
start_date = 2020-01-01
end_date = 2024-12-31
data_dir = /srv/bars
parallel = false
cache = true

[strategy]
profile = mean_reversion
interval = 1d
rsi_window = 10
bollinger_k = 2.5
stop_loss_pct = 0.03
profit_target_pct = 0.08
"#;

mod config_loading {
    use super::*;

    #[test]
    fn build_backtest_config_from_file() {
        let file = write_temp_ini(VALID_INI);
        let adapter = cli::load_config(file.path()).unwrap();
        let config = cli::build_backtest_config(&adapter, None, None, false).unwrap();

        assert_eq!(config.codes, vec!["BHP", "CBA", "WBC"]);
        assert_eq!(config.start_date, date(2020, 1, 1));
        assert_eq!(config.end_date, date(2024, 12, 31));
        assert_eq!(config.data_dir, PathBuf::from("/srv/bars"));
        assert!(!config.parallel);
        assert!(config.cache);
    }

    #[test]
    fn command_line_overrides_win() {
        let file = write_temp_ini(VALID_INI);
        let adapter = cli::load_config(file.path()).unwrap();
        let config =
            cli::build_backtest_config(&adapter, Some("nab"), Some(PathBuf::from("bars")), true)
                .unwrap();
        assert_eq!(config.codes, vec!["NAB"]);
        assert_eq!(config.data_dir, PathBuf::from("bars"));
        assert!(!config.parallel);
    }

    #[test]
    fn missing_file_is_config_parse_error() {
        let err = cli::load_config(std::path::Path::new("/nonexistent/barsignal.ini")).unwrap_err();
        assert!(matches!(err, BarsignalError::ConfigParse { .. }));
    }

    #[test]
    fn missing_end_date() {
        let file = write_temp_ini("[backtest]\ncodes = BHP\nstart_date = 2020-01-01\n");
        let adapter = cli::load_config(file.path()).unwrap();
        let err = cli::build_backtest_config(&adapter, None, None, false).unwrap_err();
        assert!(matches!(err, BarsignalError::ConfigMissing { key, .. } if key == "end_date"));
    }

    #[test]
    fn reversed_date_range_is_config_error() {
        let file = write_temp_ini(
            "[backtest]\ncodes = BHP\nstart_date = 2024-12-31\nend_date = 2020-01-01\n",
        );
        let adapter = cli::load_config(file.path()).unwrap();
        let err = cli::build_backtest_config(&adapter, None, None, false).unwrap_err();
        assert!(matches!(err, BarsignalError::ConfigInvalid { ref key, .. } if key == "start_date"));
        assert!(same_exit(ExitCode::from(&err), ExitCode::from(2)));
    }

    #[test]
    fn empty_code_token_rejected() {
        let file = write_temp_ini(
            "[backtest]\ncodes = BHP,,CBA\nstart_date = 2020-01-01\nend_date = 2024-12-31\n",
        );
        let adapter = cli::load_config(file.path()).unwrap();
        let err = cli::build_backtest_config(&adapter, None, None, false).unwrap_err();
        assert!(matches!(err, BarsignalError::ConfigInvalid { key, .. } if key == "codes"));
    }
}

mod strategy_building {
    use super::*;

    #[test]
    fn overrides_layer_over_profile_defaults() {
        let file = write_temp_ini(VALID_INI);
        let adapter = cli::load_config(file.path()).unwrap();
        let strategy = cli::build_strategy(&adapter, None).unwrap();

        assert_eq!(strategy.profile, Profile::MeanReversion);
        assert_eq!(strategy.config.rsi_window, 10);
        assert_eq!(strategy.config.bollinger_k, 2.5);
        assert_eq!(strategy.config.stop_loss_pct, 0.03);
        assert_eq!(strategy.config.profit_target_pct, 0.08);
        assert_eq!(strategy.config.rsi_entry_threshold, 70.0);

        let indicators = strategy.required_indicators();
        assert!(indicators.contains(&IndicatorType::Rsi(10)));
        assert!(indicators.contains(&IndicatorType::Bollinger {
            period: 20,
            stddev_mult_x100: 250,
        }));
    }

    #[test]
    fn intraday_interval_shrinks_windows() {
        let file = write_temp_ini("[strategy]\nprofile = trend_momentum\ninterval = 15m\n");
        let adapter = cli::load_config(file.path()).unwrap();
        let strategy = cli::build_strategy(&adapter, None).unwrap();

        let windows = Interval::FifteenMinutes.windows();
        assert_eq!(strategy.config.interval, Interval::FifteenMinutes);
        assert_eq!(strategy.config.trend_slow_window, windows.trend_slow);
        assert_eq!(strategy.config.rsi_window, windows.rsi);
        assert!(strategy.min_bars() < 201);
    }

    #[test]
    fn exit_priority_and_time_exit_keys() {
        let file = write_temp_ini(
            "[strategy]\nprofile = macd_pullback\nexit_priority = profit_target_first\nmax_holding_bars = 8\n",
        );
        let adapter = cli::load_config(file.path()).unwrap();
        let strategy = cli::build_strategy(&adapter, None).unwrap();
        assert_eq!(strategy.config.exit_priority, ExitPriority::ProfitTargetFirst);
        assert_eq!(strategy.config.max_holding_bars, Some(8));
    }

    #[test]
    fn unknown_interval_rejected() {
        let file = write_temp_ini("[strategy]\ninterval = 2w\n");
        let adapter = cli::load_config(file.path()).unwrap();
        let err = cli::build_strategy(&adapter, None).unwrap_err();
        assert!(matches!(err, BarsignalError::ConfigInvalid { key, .. } if key == "interval"));
    }

    #[test]
    fn invalid_override_maps_to_config_exit_code() {
        let file = write_temp_ini("[strategy]\nstop_loss_pct = 2.0\n");
        let adapter = cli::load_config(file.path()).unwrap();
        let err = cli::build_strategy(&adapter, None).unwrap_err();
        assert!(same_exit(ExitCode::from(&err), ExitCode::from(2)));
    }
}

mod pipeline {
    use super::*;

    fn strategy() -> barsignal::domain::strategy::Strategy {
        let file = write_temp_ini("[strategy]\nprofile = candle_breakout\n");
        let adapter = cli::load_config(file.path()).unwrap();
        cli::build_strategy(&adapter, None).unwrap()
    }

    #[test]
    fn pipeline_succeeds_with_partial_failures() {
        let port = MockDataPort::new()
            .with_bars("BHP", generate_bars("BHP", "2023-01-01", 120, 45.0))
            .with_error("CBA", "timeout");
        let config = sample_config(&["BHP", "CBA"]);
        let code = cli::run_backtest_pipeline(&port, &strategy(), &config);
        assert!(same_exit(code, ExitCode::SUCCESS));
    }

    #[test]
    fn pipeline_fails_when_every_ticker_fails() {
        let port = MockDataPort::new().with_error("CBA", "timeout");
        let config = sample_config(&["CBA"]);
        let code = cli::run_backtest_pipeline(&port, &strategy(), &config);
        assert!(same_exit(code, ExitCode::from(3)));
    }

    #[test]
    fn format_batch_lists_completed_tickers() {
        let port = MockDataPort::new()
            .with_bars("BHP", generate_bars("BHP", "2023-01-01", 120, 45.0))
            .with_bars("RIO", generate_bars("RIO", "2023-01-01", 120, 80.0));
        let strategy = strategy();
        let batch = run_batch(&port, &strategy, &sample_config(&["BHP", "RIO"]), None);
        let table = cli::format_batch(&strategy, &batch);

        assert!(table.starts_with("Profile: candle_breakout (1d)"));
        let bhp = table.find("BHP").unwrap();
        let rio = table.find("RIO").unwrap();
        assert!(bhp < rio);
        assert!(table.contains("120"));
    }

    #[test]
    fn csv_files_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let bars = generate_bars("WES", "2023-01-01", 90, 60.0);
        write_csv(&dir.path().join("WES.csv"), &bars);

        let port = CsvAdapter::new(dir.path().to_path_buf());
        let mut config = sample_config(&["WES", "MISSING"]);
        config.data_dir = dir.path().to_path_buf();
        let batch = run_batch(&port, &strategy(), &config, None);

        assert_eq!(batch.reports.len(), 1);
        assert_eq!(batch.reports[0].bars, 90);
        assert_eq!(batch.reports[0].first_timestamp, bars[0].timestamp);
        assert_eq!(batch.failures.len(), 1);
        assert!(matches!(batch.failures[0].error, BarsignalError::Provider { .. }));
    }

    #[test]
    fn hourly_csv_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let start = midnight("2024-03-04") + chrono::Duration::hours(10);
        let bars = generate_bars_every("CSL", start, chrono::Duration::hours(1), 60, 250.0);
        write_csv(&dir.path().join("CSL.csv"), &bars);

        let file = write_temp_ini("[strategy]\nprofile = candle_breakout\ninterval = 1h\n");
        let adapter = cli::load_config(file.path()).unwrap();
        let strategy = cli::build_strategy(&adapter, None).unwrap();

        let port = CsvAdapter::new(dir.path().to_path_buf());
        let batch = run_batch(&port, &strategy, &sample_config(&["CSL"]), None);

        assert!(batch.failures.is_empty());
        let report = &batch.reports[0];
        assert_eq!(report.bars, 60);
        assert_eq!(report.first_timestamp, start);
        assert_eq!(report.last_timestamp, start + chrono::Duration::hours(59));
    }
}
