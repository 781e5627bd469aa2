#![allow(dead_code)]

use barlag::domain::error::BacktestError;
use barlag::domain::price::PriceSeries;
use barlag::domain::signal::Signal;
use barlag::domain::strategy::SignalGenerator;
use barlag::ports::price_port::PriceSource;
use chrono::NaiveDate;
use std::cell::RefCell;
use std::io::Write;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Daily series for `TEST` starting 2024-01-01.
pub fn series(prices: &[f64]) -> PriceSeries {
    PriceSeries::daily("TEST", date("2024-01-01"), prices).unwrap()
}

/// Replays a fixed signal list: the history ending at bar `i` yields
/// `signals[i]`, anything past the end yields `Hold`. Records the length of
/// every history it is shown.
pub struct ScriptedStrategy {
    signals: Vec<Signal>,
    seen: RefCell<Vec<usize>>,
}

impl ScriptedStrategy {
    pub fn new(signals: Vec<Signal>) -> Self {
        Self {
            signals,
            seen: RefCell::new(Vec::new()),
        }
    }

    pub fn from_values(values: &[i8]) -> Self {
        Self::new(
            values
                .iter()
                .map(|v| Signal::from_value(*v).unwrap())
                .collect(),
        )
    }

    pub fn seen(&self) -> Vec<usize> {
        self.seen.borrow().clone()
    }
}

impl SignalGenerator for ScriptedStrategy {
    fn signal(&self, history: &[f64]) -> Signal {
        self.seen.borrow_mut().push(history.len());
        history
            .len()
            .checked_sub(1)
            .and_then(|i| self.signals.get(i).copied())
            .unwrap_or(Signal::Hold)
    }

    fn name(&self) -> String {
        "scripted".to_string()
    }
}

pub struct MockPriceSource {
    pub series: Option<PriceSeries>,
    pub error: Option<String>,
}

impl MockPriceSource {
    pub fn with_series(series: PriceSeries) -> Self {
        Self {
            series: Some(series),
            error: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            series: None,
            error: Some(reason.to_string()),
        }
    }
}

impl PriceSource for MockPriceSource {
    fn load_prices(&self) -> Result<PriceSeries, BacktestError> {
        if let Some(reason) = &self.error {
            return Err(BacktestError::PriceData {
                reason: reason.clone(),
            });
        }
        self.series.clone().ok_or_else(|| BacktestError::PriceData {
            reason: "no series".into(),
        })
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

pub fn write_temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    write_temp_file(".ini", content)
}
