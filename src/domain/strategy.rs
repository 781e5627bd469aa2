//! Signal generation.
//!
//! A [`SignalGenerator`] is a pure function from a price history to a
//! [`Signal`] dated at the last bar of that history. It is handed only the
//! prefix it may see, so it cannot read bars that have not happened yet.

use crate::domain::error::BacktestError;
use crate::domain::moving_average::trailing_mean;
use crate::domain::signal::Signal;

pub trait SignalGenerator {
    /// Signal for the last bar of `history`. An empty history yields `Hold`.
    fn signal(&self, history: &[f64]) -> Signal;

    fn name(&self) -> String;

    /// Trailing bars the signal depends on.
    fn lookback(&self) -> usize {
        1
    }

    /// Signals aligned index-for-index with `prices`; entry `i` depends only
    /// on `prices[..=i]`.
    fn signals(&self, prices: &[f64]) -> Vec<Signal> {
        (1..=prices.len())
            .map(|end| self.signal(&prices[..end]))
            .collect()
    }
}

impl<S: SignalGenerator + ?Sized> SignalGenerator for &S {
    fn signal(&self, history: &[f64]) -> Signal {
        (**self).signal(history)
    }

    fn name(&self) -> String {
        (**self).name()
    }

    fn lookback(&self) -> usize {
        (**self).lookback()
    }
}

/// Price-versus-trailing-mean rule.
///
/// BUY when the latest price is above the mean of the last `window` prices
/// (itself included), SELL when below, HOLD when equal, while the window is
/// still filling, or when any price in the window is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovingAverageStrategy {
    window: usize,
}

impl MovingAverageStrategy {
    pub fn new(window: usize) -> Result<Self, BacktestError> {
        if window < 1 {
            return Err(BacktestError::config("window", "window must be at least 1"));
        }
        Ok(Self { window })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Signal at index `i` of `prices`, reading only `prices[..=i]`.
    pub fn signal_at(&self, prices: &[f64], i: usize) -> Signal {
        if i >= prices.len() {
            return Signal::Hold;
        }
        self.signal(&prices[..=i])
    }
}

impl SignalGenerator for MovingAverageStrategy {
    fn signal(&self, history: &[f64]) -> Signal {
        let Some(end) = history.len().checked_sub(1) else {
            return Signal::Hold;
        };
        let Some(mean) = trailing_mean(history, end, self.window) else {
            return Signal::Hold;
        };

        let price = history[end];
        if within_rounding(price, mean, self.window) {
            Signal::Hold
        } else if price > mean {
            Signal::Buy
        } else {
            Signal::Sell
        }
    }

    fn name(&self) -> String {
        format!("MA({})", self.window)
    }

    fn lookback(&self) -> usize {
        self.window
    }
}

/// True when `price` and `mean` differ by no more than the rounding error a
/// `window`-term sum can accumulate, so a flat window reads as equal.
fn within_rounding(price: f64, mean: f64, window: usize) -> bool {
    let scale = price.abs().max(mean.abs());
    (price - mean).abs() <= 4.0 * f64::EPSILON * window as f64 * scale
}
