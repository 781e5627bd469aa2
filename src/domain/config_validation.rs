//! Configuration validation.
//!
//! Validates every recognised key before a run starts. Missing keys are
//! allowed where a default exists; present-but-malformed keys never are.

use std::str::FromStr;

use chrono::NaiveDate;

use crate::domain::error::BacktestError;
use crate::ports::config_port::ConfigPort;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_window(config)?;
    validate_initial_cash(config)?;
    validate_trade_quantity(config)?;
    parse_key::<usize>(config, "backtest", "warmup")?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    match data_source(config)?.as_str() {
        "csv" => {
            if config.get_string("data", "path").is_none() {
                return Err(BacktestError::config(
                    "data.path",
                    "path is required when source = csv",
                ));
            }
        }
        _ => {
            validate_start_price(config)?;
            validate_volatility(config)?;
            parse_key::<usize>(config, "data", "num_ticks")?;
            parse_key::<u64>(config, "data", "seed")?;
            parse_date(config, "data", "start_date")?;
        }
    }
    Ok(())
}

/// `synthetic` unless configured otherwise.
pub fn data_source(config: &dyn ConfigPort) -> Result<String, BacktestError> {
    let source = config
        .get_string("data", "source")
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| "synthetic".to_string());
    match source.as_str() {
        "synthetic" | "csv" => Ok(source),
        other => Err(BacktestError::config(
            "data.source",
            format!("unknown source {:?}, expected synthetic or csv", other),
        )),
    }
}

/// Parsed value of `[section] key`, `None` when absent.
pub fn parse_key<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, BacktestError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            BacktestError::config(
                &format!("{}.{}", section, key),
                format!("cannot parse {:?}", raw),
            )
        }),
    }
}

pub fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, BacktestError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
            .map(Some)
            .map_err(|_| {
                BacktestError::config(
                    &format!("{}.{}", section, key),
                    "invalid date format, expected YYYY-MM-DD",
                )
            }),
    }
}

fn validate_window(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    match parse_key::<i64>(config, "backtest", "window")? {
        Some(w) if w < 1 => Err(BacktestError::config(
            "backtest.window",
            "window must be a positive integer",
        )),
        _ => Ok(()),
    }
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    match parse_key::<f64>(config, "backtest", "initial_cash")? {
        Some(v) if !v.is_finite() || v < 0.0 => Err(BacktestError::config(
            "backtest.initial_cash",
            "initial_cash must be a finite non-negative number",
        )),
        _ => Ok(()),
    }
}

fn validate_trade_quantity(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    match parse_key::<f64>(config, "backtest", "trade_quantity")? {
        Some(v) if !v.is_finite() || v < 0.0 => Err(BacktestError::config(
            "backtest.trade_quantity",
            "trade_quantity must be a finite non-negative number",
        )),
        _ => Ok(()),
    }
}

fn validate_start_price(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    match parse_key::<f64>(config, "data", "start_price")? {
        Some(v) if !v.is_finite() || v <= 0.0 => Err(BacktestError::config(
            "data.start_price",
            "start_price must be a finite positive number",
        )),
        _ => Ok(()),
    }
}

fn validate_volatility(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    match parse_key::<f64>(config, "data", "volatility")? {
        Some(v) if !v.is_finite() || v < 0.0 => Err(BacktestError::config(
            "data.volatility",
            "volatility must be a finite non-negative number",
        )),
        _ => Ok(()),
    }
}
