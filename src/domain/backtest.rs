//! Backtest engine and event loop.
//!
//! Bar `t` trades on the signal dated `t - 1`, computed from prices up to and
//! including `t - 1`, and fills at the price of bar `t`. The first recorded
//! bar never trades. Equity is always derived from the broker state and the
//! bar price, never carried forward.

use chrono::NaiveDate;
use log::{debug, info, warn};

use crate::domain::broker::{Broker, DEFAULT_INITIAL_CASH, Fill, Side};
use crate::domain::error::BacktestError;
use crate::domain::price::PriceSeries;
use crate::domain::signal::Signal;
use crate::domain::strategy::{MovingAverageStrategy, SignalGenerator};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub window: usize,
    pub initial_cash: f64,
    pub trade_quantity: f64,
    pub warmup: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            window: 5,
            initial_cash: DEFAULT_INITIAL_CASH,
            trade_quantity: 1.0,
            warmup: 0,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.window < 1 {
            return Err(BacktestError::config("window", "window must be at least 1"));
        }
        if !self.initial_cash.is_finite() || self.initial_cash < 0.0 {
            return Err(BacktestError::config(
                "initial_cash",
                "initial_cash must be a finite non-negative number",
            ));
        }
        self.execution_params().validate()
    }

    pub fn execution_params(&self) -> ExecutionParams {
        ExecutionParams {
            trade_quantity: self.trade_quantity,
            warmup: self.warmup,
        }
    }
}

/// How signals become orders.
///
/// BUY fills `trade_quantity` units long, SELL fills `trade_quantity` units
/// short, HOLD issues nothing. Repeated signals accumulate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionParams {
    pub trade_quantity: f64,
    /// Leading bars that only feed the signal generator.
    pub warmup: usize,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        ExecutionParams {
            trade_quantity: 1.0,
            warmup: 0,
        }
    }
}

impl ExecutionParams {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if !self.trade_quantity.is_finite() || self.trade_quantity < 0.0 {
            return Err(BacktestError::config(
                "trade_quantity",
                "trade_quantity must be a finite non-negative number",
            ));
        }
        Ok(())
    }

    /// Order implied by a signal, if any.
    pub fn order_for(&self, signal: Signal) -> Option<(Side, f64)> {
        Side::from_signal(signal).map(|side| (side, self.trade_quantity))
    }
}

/// Account state recorded at the close of one bar.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRow {
    pub index: usize,
    pub date: NaiveDate,
    pub price: f64,
    /// `None` on the first recorded bar.
    pub signal: Option<Signal>,
    pub fill: Option<Fill>,
    pub position: f64,
    pub cash: f64,
    pub equity: f64,
}

impl BacktestRow {
    fn record(
        index: usize,
        date: NaiveDate,
        price: f64,
        signal: Option<Signal>,
        fill: Option<Fill>,
        broker: &Broker,
    ) -> Self {
        BacktestRow {
            index,
            date,
            price,
            signal,
            fill,
            position: broker.position(),
            cash: broker.cash(),
            equity: broker.equity(price),
        }
    }

    /// |equity - (cash + position * price)|
    pub fn equity_gap(&self) -> f64 {
        (self.equity - (self.cash + self.position * self.price)).abs()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub symbol: String,
    pub strategy: String,
    pub initial_cash: f64,
    pub initial_position: f64,
    pub rows: Vec<BacktestRow>,
}

impl BacktestResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&BacktestRow> {
        self.rows.last()
    }

    pub fn final_equity(&self) -> f64 {
        self.rows
            .last()
            .map(|r| r.equity)
            .unwrap_or(self.initial_cash)
    }

    pub fn fills(&self) -> impl Iterator<Item = &Fill> {
        self.rows.iter().filter_map(|r| r.fill.as_ref())
    }

    /// True when every row satisfies `equity == cash + position * price`
    /// within `epsilon`.
    pub fn equity_identity_holds(&self, epsilon: f64) -> bool {
        self.rows.iter().all(|r| r.equity_gap() <= epsilon)
    }
}

pub struct Backtester<S> {
    strategy: S,
    broker: Broker,
    params: ExecutionParams,
}

impl<S: SignalGenerator> Backtester<S> {
    pub fn new(
        strategy: S,
        broker: Broker,
        params: ExecutionParams,
    ) -> Result<Self, BacktestError> {
        params.validate()?;
        Ok(Backtester {
            strategy,
            broker,
            params,
        })
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn params(&self) -> &ExecutionParams {
        &self.params
    }

    pub fn into_broker(self) -> Broker {
        self.broker
    }

    /// Runs one pass over `series`.
    ///
    /// The broker is not reset: a second run continues from the state the
    /// first one left. Any invalid price or rejected order aborts the run.
    pub fn run(&mut self, series: &PriceSeries) -> Result<BacktestResult, BacktestError> {
        let prices = series.prices();
        let dates = series.dates();
        let start = self.params.warmup.min(prices.len());
        let lookback = self.strategy.lookback();

        info!(
            "running {} on {}: {} bars ({} warm-up), quantity {}",
            self.strategy.name(),
            series.symbol(),
            prices.len() - start,
            start,
            self.params.trade_quantity
        );

        let mut result = BacktestResult {
            symbol: series.symbol().to_string(),
            strategy: self.strategy.name(),
            initial_cash: self.broker.cash(),
            initial_position: self.broker.position(),
            rows: Vec::with_capacity(prices.len() - start),
        };

        for t in start..prices.len() {
            let date = dates[t];
            let price = prices[t];

            if !price.is_finite() {
                return Err(BacktestError::InvalidPrice { index: t, date, price });
            }

            let signal = if t == start {
                None
            } else {
                let history = &prices[..t];
                let window_start = t.saturating_sub(lookback);
                if history[window_start..].iter().any(|p| p.is_nan()) {
                    warn!("{}: missing price within lookback, holding", date);
                }
                Some(self.strategy.signal(history))
            };

            let fill = match signal.and_then(|s| self.params.order_for(s)) {
                Some((side, quantity)) => {
                    let cash_before = self.broker.cash();
                    // Params and prices are checked before this point, so the
                    // broker only rejects here if those checks are bypassed.
                    let fill = self
                        .broker
                        .execute(side, quantity, price)
                        .map_err(|source| BacktestError::InvalidOrder {
                            index: t,
                            date,
                            source,
                        })?;
                    debug!(
                        "{}: {} {} @ {:.2} -> cash {:.2}, position {}",
                        date, side, quantity, price, fill.cash, fill.position
                    );
                    if cash_before >= 0.0 && fill.cash < 0.0 {
                        warn!("{}: cash went negative ({:.2})", date, fill.cash);
                    }
                    Some(fill)
                }
                None => None,
            };

            let row = BacktestRow::record(t, date, price, signal, fill, &self.broker);
            debug_assert!(row.equity_gap() <= 1e-9 * row.equity.abs().max(1.0));
            result.rows.push(row);
        }

        info!(
            "finished {}: {} rows, {} fills, final equity {:.2}",
            result.symbol,
            result.len(),
            result.fills().count(),
            result.final_equity()
        );

        Ok(result)
    }
}

/// Validates `config`, builds a moving-average strategy and a fresh broker,
/// and runs them over `series`.
pub fn run_backtest(
    series: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, BacktestError> {
    config.validate()?;
    let strategy = MovingAverageStrategy::new(config.window)?;
    let broker = Broker::new(config.initial_cash)?;
    Backtester::new(strategy, broker, config.execution_params())?.run(series)
}
