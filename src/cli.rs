//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{self, CsvPriceSource, CsvResultWriter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::synthetic_adapter::SyntheticSource;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult, BacktestRow};
use crate::domain::config_validation::{
    data_source, parse_date, parse_key, validate_backtest_config, validate_data_config,
};
use crate::domain::error::BacktestError;
use crate::domain::generator::PriceGenerator;
use crate::domain::metrics::Summary;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PriceSource;
use crate::ports::result_port::ResultSink;

pub const DEFAULT_SYMBOL: &str = "AAPL";
pub const DEFAULT_START_PRICE: f64 = 150.0;
pub const DEFAULT_NUM_TICKS: usize = 100;
pub const DEFAULT_VOLATILITY: f64 = 0.02;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_ROWS: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "barlag", about = "Single-asset moving-average backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over CSV or synthetic prices
    Run(RunArgs),
    /// Write a synthetic price series to CSV
    Generate {
        #[arg(long, default_value = DEFAULT_SYMBOL)]
        symbol: String,
        #[arg(long, default_value_t = DEFAULT_START_PRICE)]
        start_price: f64,
        #[arg(long, default_value_t = DEFAULT_NUM_TICKS)]
        ticks: usize,
        #[arg(long, default_value_t = DEFAULT_VOLATILITY)]
        volatility: f64,
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Flags for `run`. Every flag overrides the matching INI key.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub window: Option<usize>,
    #[arg(long)]
    pub initial_cash: Option<f64>,
    #[arg(long)]
    pub trade_quantity: Option<f64>,
    #[arg(long)]
    pub warmup: Option<usize>,
    /// Price CSV; selects the csv source
    #[arg(long, conflicts_with_all = ["seed", "ticks", "start_price", "volatility"])]
    pub prices: Option<PathBuf>,
    #[arg(long)]
    pub symbol: Option<String>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long)]
    pub ticks: Option<usize>,
    #[arg(long)]
    pub start_price: Option<f64>,
    #[arg(long)]
    pub volatility: Option<f64>,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Rows printed from each end of the result table
    #[arg(long, default_value_t = DEFAULT_ROWS)]
    pub rows: usize,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run(args) => run_backtest(&args),
        Command::Generate {
            symbol,
            start_price,
            ticks,
            volatility,
            seed,
            start_date,
            output,
        } => {
            let generator = PriceGenerator {
                symbol,
                start_price,
                volatility,
                seed,
                start_date: start_date.unwrap_or_else(default_start_date),
            };
            run_generate(&generator, ticks, &output)
        }
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn run_backtest(args: &RunArgs) -> ExitCode {
    let mut adapter = match &args.config {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            match load_config(path) {
                Ok(a) => a,
                Err(code) => return code,
            }
        }
        None => FileConfigAdapter::empty(),
    };
    apply_run_overrides(&mut adapter, args);

    let (result, summary) = match execute_backtest(&adapter) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    for line in format_rows(&result, args.rows) {
        println!("{}", line);
    }
    eprintln!();
    for line in format_summary(&summary) {
        eprintln!("{}", line);
    }

    if let Some(path) = adapter.get_string("output", "path") {
        let path = PathBuf::from(path);
        if let Err(e) = CsvResultWriter::new(path.clone()).write(&result) {
            eprintln!("error: failed to write results: {e}");
            return (&e).into();
        }
        eprintln!("\nResults written to: {}", path.display());
    }

    ExitCode::SUCCESS
}

/// Writes every `run` flag that was given into `adapter`.
pub fn apply_run_overrides(adapter: &mut FileConfigAdapter, args: &RunArgs) {
    adapter.set_override("backtest", "window", args.window);
    adapter.set_override("backtest", "initial_cash", args.initial_cash);
    adapter.set_override("backtest", "trade_quantity", args.trade_quantity);
    adapter.set_override("backtest", "warmup", args.warmup);

    if let Some(prices) = &args.prices {
        adapter.set_override("data", "source", Some("csv"));
        adapter.set_override("data", "path", Some(prices.display()));
    } else if args.seed.is_some()
        || args.ticks.is_some()
        || args.start_price.is_some()
        || args.volatility.is_some()
    {
        adapter.set_override("data", "source", Some("synthetic"));
    }
    adapter.set_override("data", "symbol", args.symbol.as_deref());
    adapter.set_override("data", "seed", args.seed);
    adapter.set_override("data", "num_ticks", args.ticks);
    adapter.set_override("data", "start_price", args.start_price);
    adapter.set_override("data", "volatility", args.volatility);

    adapter.set_override("output", "path", args.output.as_ref().map(|p| p.display()));
}

/// Validates `config`, loads prices, runs the backtest and summarises it.
pub fn execute_backtest(
    config: &dyn ConfigPort,
) -> Result<(BacktestResult, Summary), BacktestError> {
    validate_backtest_config(config)?;
    validate_data_config(config)?;

    let bt_config = build_backtest_config(config)?;
    let source = build_price_source(config)?;

    eprintln!("Loading prices from {}", source.describe());
    let series = source.load_prices()?;
    if series.missing_count() > 0 {
        eprintln!(
            "  {} of {} prices missing",
            series.missing_count(),
            series.len()
        );
    }

    eprintln!(
        "Running backtest: {} bars of {}, window {}, quantity {}",
        series.len(),
        series.symbol(),
        bt_config.window,
        bt_config.trade_quantity
    );
    let result = backtest_engine::run_backtest(&series, &bt_config)?;
    let summary = Summary::compute(&result);
    Ok((result, summary))
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, BacktestError> {
    let defaults = BacktestConfig::default();
    let bt_config = BacktestConfig {
        window: parse_key(config, "backtest", "window")?.unwrap_or(defaults.window),
        initial_cash: parse_key(config, "backtest", "initial_cash")?
            .unwrap_or(defaults.initial_cash),
        trade_quantity: parse_key(config, "backtest", "trade_quantity")?
            .unwrap_or(defaults.trade_quantity),
        warmup: parse_key(config, "backtest", "warmup")?.unwrap_or(defaults.warmup),
    };
    bt_config.validate()?;
    Ok(bt_config)
}

pub fn build_price_generator(config: &dyn ConfigPort) -> Result<PriceGenerator, BacktestError> {
    let generator = PriceGenerator {
        symbol: config
            .get_string("data", "symbol")
            .unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
        start_price: parse_key(config, "data", "start_price")?.unwrap_or(DEFAULT_START_PRICE),
        volatility: parse_key(config, "data", "volatility")?.unwrap_or(DEFAULT_VOLATILITY),
        seed: parse_key(config, "data", "seed")?.unwrap_or(DEFAULT_SEED),
        start_date: parse_date(config, "data", "start_date")?.unwrap_or_else(default_start_date),
    };
    generator.validate()?;
    Ok(generator)
}

pub fn build_price_source(config: &dyn ConfigPort) -> Result<Box<dyn PriceSource>, BacktestError> {
    match data_source(config)?.as_str() {
        "csv" => {
            let path = config.get_string("data", "path").ok_or_else(|| {
                BacktestError::InvalidConfiguration {
                    key: "data.path".into(),
                    reason: "path is required when source = csv".into(),
                }
            })?;
            let mut source = CsvPriceSource::new(PathBuf::from(path));
            if let Some(symbol) = config.get_string("data", "symbol") {
                source = source.with_symbol(&symbol);
            }
            Ok(Box::new(source))
        }
        _ => {
            let generator = build_price_generator(config)?;
            let ticks = parse_key(config, "data", "num_ticks")?.unwrap_or(DEFAULT_NUM_TICKS);
            Ok(Box::new(SyntheticSource::new(generator, ticks)))
        }
    }
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default()
}

/// Table lines: a header, then the first and last `n` rows with an elision
/// marker between them when rows were skipped.
pub fn format_rows(result: &BacktestResult, n: usize) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<10}  {:>10}  {:>6}  {:>10}  {:>14}  {:>14}",
        "date", "price", "signal", "position", "cash", "equity"
    )];

    let rows = &result.rows;
    if rows.len() <= n.saturating_mul(2) {
        lines.extend(rows.iter().map(format_row));
    } else {
        lines.extend(rows[..n].iter().map(format_row));
        lines.push(format!("... {} rows ...", rows.len() - 2 * n));
        lines.extend(rows[rows.len() - n..].iter().map(format_row));
    }
    lines
}

fn format_row(row: &BacktestRow) -> String {
    let signal = row.signal.map(|s| s.to_string()).unwrap_or_default();
    format!(
        "{:<10}  {:>10.2}  {:>6}  {:>10}  {:>14.2}  {:>14.2}",
        row.date, row.price, signal, row.position, row.cash, row.equity
    )
}

pub fn format_summary(summary: &Summary) -> Vec<String> {
    vec![
        "=== Performance Summary ===".to_string(),
        format!("Initial Equity:   {:.2}", summary.initial_equity),
        format!("Final Equity:     {:.2}", summary.final_equity),
        format!("Total Return:     {:.2}%", summary.total_return * 100.0),
        format!("Max Drawdown:     -{:.1}%", summary.max_drawdown * 100.0),
        format!("Final Position:   {}", summary.final_position),
        format!("Final Cash:       {:.2}", summary.final_cash),
        format!(
            "Fills:            {} ({} buy, {} sell) over {} bars",
            summary.fills, summary.buys, summary.sells, summary.bars
        ),
    ]
}

fn run_generate(generator: &PriceGenerator, ticks: usize, output: &Path) -> ExitCode {
    let series = match generator.series(ticks) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if let Err(e) = csv_adapter::write_prices(output, &series) {
        eprintln!("error: failed to write prices: {e}");
        return (&e).into();
    }
    info!("generated {} prices for {}", series.len(), series.symbol());
    eprintln!(
        "Wrote {} prices for {} to {}",
        series.len(),
        series.symbol(),
        output.display()
    );
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let checked = validate_backtest_config(&adapter)
        .and_then(|()| validate_data_config(&adapter))
        .and_then(|()| build_backtest_config(&adapter))
        .and_then(|bt| build_price_source(&adapter).map(|source| (bt, source)));

    match checked {
        Ok((bt, source)) => {
            eprintln!("\nBacktest:");
            eprintln!("  window:         {}", bt.window);
            eprintln!("  initial_cash:   {:.2}", bt.initial_cash);
            eprintln!("  trade_quantity: {}", bt.trade_quantity);
            eprintln!("  warmup:         {}", bt.warmup);
            eprintln!("\nData:");
            eprintln!("  source:         {}", source.describe());
            eprintln!("\nConfiguration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
