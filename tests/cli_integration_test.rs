//! CLI integration tests for the run, generate and validate commands.
//!
//! Tests cover:
//! - Config parsing (build_backtest_config, build_price_source)
//! - Flag overrides on top of INI files
//! - `run` against CSV and synthetic prices, with result export
//! - `generate` writing a loadable price file
//! - `validate` with real INI files on disk
//! - Exit codes for each error class

mod common;

use barlag::adapters::csv_adapter::CsvPriceSource;
use barlag::adapters::file_config_adapter::FileConfigAdapter;
use barlag::cli::{self, Cli};
use barlag::domain::error::BacktestError;
use barlag::ports::price_port::PriceSource;
use clap::Parser;
use common::*;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

const VALID_INI: &str = r#"
[backtest]
window = 3
initial_cash = 10000
trade_quantity = 1
warmup = 0

[data]
source = synthetic
symbol = MSFT
start_price = 400.0
num_ticks = 50
volatility = 0.01
seed = 7
start_date = 2024-06-01
"#;

fn exit_is(code: ExitCode, expected: u8) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::from(expected))
}

fn run_args(args: &[&str]) -> ExitCode {
    let mut argv = vec!["barlag"];
    argv.extend_from_slice(args);
    cli::run(Cli::try_parse_from(argv).unwrap())
}

mod config_loading {
    use super::*;

    #[test]
    fn build_backtest_config_valid_full() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config = cli::build_backtest_config(&adapter).unwrap();
        assert_eq!(config.window, 3);
        assert!((config.initial_cash - 10_000.0).abs() < f64::EPSILON);
        assert!((config.trade_quantity - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.warmup, 0);
    }

    #[test]
    fn build_price_generator_reads_data_section() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let generator = cli::build_price_generator(&adapter).unwrap();
        assert_eq!(generator.symbol, "MSFT");
        assert_eq!(generator.seed, 7);
        assert_eq!(generator.start_date, date("2024-06-01"));
    }

    #[test]
    fn synthetic_source_is_reproducible() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let a = cli::build_price_source(&adapter).unwrap().load_prices().unwrap();
        let b = cli::build_price_source(&adapter).unwrap().load_prices().unwrap();
        assert_eq!(a.len(), 50);
        assert_eq!(a, b);
    }

    #[test]
    fn non_numeric_window_is_rejected() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nwindow = ten\n").unwrap();
        let err = cli::build_backtest_config(&adapter).unwrap_err();
        assert!(matches!(err, BacktestError::InvalidConfiguration { .. }));
    }
}

mod execute {
    use super::*;

    #[test]
    fn csv_prices_reference_scenario() {
        let csv = write_temp_file(
            ".csv",
            "date,price\n2025-01-01,10\n2025-01-02,10\n2025-01-03,10\n\
             2025-01-04,12\n2025-01-05,8\n2025-01-06,9\n",
        );
        let ini = format!(
            "[backtest]\nwindow = 3\ninitial_cash = 10000\n[data]\nsource = csv\npath = {}\n",
            file_path(&csv)
        );
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let (result, summary) = cli::execute_backtest(&adapter).unwrap();

        assert_eq!(result.len(), 6);
        assert_eq!(summary.buys, 1);
        assert_eq!(summary.sells, 1);
        assert!((summary.final_cash - 10_001.0).abs() < 1e-9);
        assert_eq!(summary.final_position, 0.0);
    }

    #[test]
    fn flags_override_ini() {
        let mut adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let args = cli::RunArgs {
            window: Some(5),
            ticks: Some(20),
            ..Default::default()
        };
        cli::apply_run_overrides(&mut adapter, &args);
        let (result, _) = cli::execute_backtest(&adapter).unwrap();
        assert_eq!(result.len(), 20);
        assert_eq!(result.strategy, "MA(5)");
        assert_eq!(result.symbol, "MSFT");
    }

    #[test]
    fn missing_price_at_execution_bar_fails() {
        let csv = write_temp_file(
            ".csv",
            "date,price\n2025-01-01,10\n2025-01-02,\n2025-01-03,10\n",
        );
        let ini = format!("[data]\nsource = csv\npath = {}\n", file_path(&csv));
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let err = cli::execute_backtest(&adapter).unwrap_err();
        assert!(matches!(err, BacktestError::InvalidPrice { index: 1, .. }));
    }

    #[test]
    fn missing_price_in_warmup_is_absorbed() {
        let csv = write_temp_file(
            ".csv",
            "date,price\n2025-01-01,10\n2025-01-02,NaN\n2025-01-03,10\n2025-01-04,11\n",
        );
        let ini = format!(
            "[backtest]\nwindow = 2\nwarmup = 2\n[data]\nsource = csv\npath = {}\n",
            file_path(&csv)
        );
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let (result, _) = cli::execute_backtest(&adapter).unwrap();
        assert_eq!(result.len(), 2);
    }
}

mod commands {
    use super::*;

    #[test]
    fn run_with_config_writes_results() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("results.csv");
        let ini = write_temp_ini(VALID_INI);

        let code = run_args(&[
            "run",
            "-c",
            &file_path(&ini),
            "-o",
            out.to_str().unwrap(),
            "--rows",
            "3",
        ]);
        assert!(exit_is(code, 0));

        let text = fs::read_to_string(&out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("date,price,signal,position,cash,equity"));
        assert_eq!(lines.count(), 50);
    }

    #[test]
    fn run_without_config_uses_flags() {
        let code = run_args(&["run", "--seed", "3", "--ticks", "15", "--window", "4"]);
        assert!(exit_is(code, 0));
    }

    #[test]
    fn run_missing_config_file_fails() {
        let code = run_args(&["run", "-c", "/nonexistent/path/config.ini"]);
        assert!(exit_is(code, 2));
    }

    #[test]
    fn run_invalid_window_fails_with_config_code() {
        let ini = write_temp_ini("[backtest]\nwindow = 0\n");
        let code = run_args(&["run", "-c", &file_path(&ini)]);
        assert!(exit_is(code, 2));
    }

    #[test]
    fn run_bad_price_file_fails_with_data_code() {
        let csv = write_temp_file(".csv", "date,price\n2025-01-01,abc\n");
        let code = run_args(&["run", "--prices", &file_path(&csv)]);
        assert!(exit_is(code, 3));
    }

    #[test]
    fn run_nan_execution_price_fails_with_price_code() {
        let csv = write_temp_file(".csv", "date,price\n2025-01-01,1\n2025-01-02,nan\n");
        let code = run_args(&["run", "--prices", &file_path(&csv)]);
        assert!(exit_is(code, 4));
    }

    #[test]
    fn generate_then_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let prices = dir.path().join("prices.csv");
        let code = run_args(&[
            "generate",
            "--symbol",
            "GOOGL",
            "--ticks",
            "30",
            "--seed",
            "11",
            "-o",
            prices.to_str().unwrap(),
        ]);
        assert!(exit_is(code, 0));

        let series = CsvPriceSource::new(prices.clone()).load_prices().unwrap();
        assert_eq!(series.symbol(), "GOOGL");
        assert_eq!(series.len(), 30);

        let code = run_args(&["run", "--prices", prices.to_str().unwrap(), "--window", "3"]);
        assert!(exit_is(code, 0));
    }

    #[test]
    fn generate_rejects_bad_volatility() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("prices.csv");
        let code = run_args(&[
            "generate",
            "--volatility=-1",
            "-o",
            out.to_str().unwrap(),
        ]);
        assert!(exit_is(code, 2));
        assert!(!out.exists());
    }

    #[test]
    fn validate_valid_config_succeeds() {
        let ini = write_temp_ini(VALID_INI);
        let code = run_args(&["validate", "-c", &file_path(&ini)]);
        assert!(exit_is(code, 0));
    }

    #[test]
    fn validate_csv_without_path_fails() {
        let ini = write_temp_ini("[data]\nsource = csv\n");
        let code = run_args(&["validate", "-c", &file_path(&ini)]);
        assert!(exit_is(code, 2));
    }
}

fn file_path(file: &tempfile::NamedTempFile) -> String {
    PathBuf::from(file.path()).display().to_string()
}
