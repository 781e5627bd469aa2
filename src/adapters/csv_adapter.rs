//! CSV price input and result output.
//!
//! Input needs a header with a `date` column (YYYY-MM-DD) and a `price` or
//! `close` column; an optional `symbol` column names the instrument. Empty
//! cells and `NaN` mark missing prices.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::backtest::{BacktestResult, BacktestRow};
use crate::domain::error::BacktestError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::ports::price_port::PriceSource;
use crate::ports::result_port::ResultSink;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvPriceSource {
    path: PathBuf,
    symbol: Option<String>,
}

impl CsvPriceSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path, symbol: None }
    }

    /// Symbol used when the file has no `symbol` column.
    pub fn with_symbol(mut self, symbol: &str) -> Self {
        self.symbol = Some(symbol.to_string());
        self
    }
}

impl PriceSource for CsvPriceSource {
    fn load_prices(&self) -> Result<PriceSeries, BacktestError> {
        let mut rdr = csv::Reader::from_path(&self.path).map_err(|e| {
            BacktestError::data(format!("failed to read {}: {}", self.path.display(), e))
        })?;

        let headers = rdr.headers()?.clone();
        let date_col = find_column(&headers, &["date", "timestamp"])
            .ok_or_else(|| BacktestError::data("missing date column"))?;
        let price_col = find_column(&headers, &["price", "close"])
            .ok_or_else(|| BacktestError::data("missing price column"))?;
        let symbol_col = find_column(&headers, &["symbol"]);

        let mut symbol = self.symbol.clone();
        let mut points = Vec::new();

        for (i, result) in rdr.records().enumerate() {
            let record = result?;

            let date_str = record
                .get(date_col)
                .ok_or_else(|| BacktestError::data(format!("row {}: missing date", i)))?;
            let date = parse_date(date_str).ok_or_else(|| {
                BacktestError::data(format!("row {}: invalid date {:?}", i, date_str))
            })?;

            let price_str = record.get(price_col).unwrap_or("");
            let price = parse_price(price_str).ok_or_else(|| {
                BacktestError::data(format!("row {}: invalid price {:?}", i, price_str))
            })?;

            if symbol.is_none() {
                symbol = symbol_col
                    .and_then(|c| record.get(c))
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty());
            }

            points.push(PricePoint::new(date, price));
        }

        let symbol = symbol.unwrap_or_else(|| {
            self.path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        PriceSeries::new(&symbol, points)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

/// Accepts `YYYY-MM-DD` and ISO timestamps whose first ten characters are a date.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .or_else(|| value.get(..10).and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok()))
}

fn parse_price(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    value.parse().ok()
}

#[derive(Debug, Serialize)]
struct ResultRecord {
    date: String,
    price: f64,
    signal: Option<i8>,
    position: f64,
    cash: f64,
    equity: f64,
}

impl From<&BacktestRow> for ResultRecord {
    fn from(row: &BacktestRow) -> Self {
        ResultRecord {
            date: row.date.format(DATE_FORMAT).to_string(),
            price: row.price,
            signal: row.signal.map(|s| s.value()),
            position: row.position,
            cash: row.cash,
            equity: row.equity,
        }
    }
}

#[derive(Debug, Serialize)]
struct PriceRecord<'a> {
    date: String,
    symbol: &'a str,
    price: f64,
}

/// Writes one row per step: `date,price,signal,position,cash,equity`.
pub fn write_results<W: Write>(writer: W, result: &BacktestResult) -> Result<(), BacktestError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in &result.rows {
        wtr.serialize(ResultRecord::from(row))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes a price series as `date,symbol,price`.
pub fn write_prices<P: AsRef<Path>>(path: P, series: &PriceSeries) -> Result<(), BacktestError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for point in series.iter() {
        wtr.serialize(PriceRecord {
            date: point.date.format(DATE_FORMAT).to_string(),
            symbol: series.symbol(),
            price: point.price,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub struct CsvResultWriter {
    path: PathBuf,
}

impl CsvResultWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ResultSink for CsvResultWriter {
    fn write(&self, result: &BacktestResult) -> Result<(), BacktestError> {
        let file = std::fs::File::create(&self.path)?;
        write_results(file, result)
    }
}
