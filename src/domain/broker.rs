//! Fill simulation for a single instrument.
//!
//! Orders fill in full, immediately, at the quoted price. There are no fees,
//! no slippage and no margin checks: cash may go negative and the position
//! may go short.

use std::fmt;

use crate::domain::error::{BacktestError, OrderError};
use crate::domain::signal::Signal;

pub const DEFAULT_INITIAL_CASH: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// BUY and SELL map to sides; HOLD has none.
    pub fn from_signal(signal: Signal) -> Option<Side> {
        match signal {
            Signal::Buy => Some(Side::Buy),
            Signal::Sell => Some(Side::Sell),
            Signal::Hold => None,
        }
    }

    fn sign(self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Confirmation of an executed order and the account state it left behind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub cash: f64,
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Broker {
    cash: f64,
    position: f64,
    fills: usize,
}

impl Broker {
    pub fn new(initial_cash: f64) -> Result<Self, BacktestError> {
        if !initial_cash.is_finite() || initial_cash < 0.0 {
            return Err(BacktestError::config(
                "initial_cash",
                "initial_cash must be a finite non-negative number",
            ));
        }
        Ok(Broker {
            cash: initial_cash,
            position: 0.0,
            fills: 0,
        })
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Executed orders so far, zero-quantity ones included.
    pub fn fills(&self) -> usize {
        self.fills
    }

    /// Mark-to-market account value at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.position * price
    }

    /// Fill `quantity` units on `side` at `price`.
    ///
    /// Validation happens before any mutation, so a rejected order leaves
    /// the account untouched.
    pub fn execute(&mut self, side: Side, quantity: f64, price: f64) -> Result<Fill, OrderError> {
        if quantity.is_nan() || quantity.is_infinite() {
            return Err(OrderError::InvalidQuantity(quantity));
        }
        if quantity < 0.0 {
            return Err(OrderError::NegativeQuantity(quantity));
        }
        if !price.is_finite() || price < 0.0 {
            return Err(OrderError::InvalidPrice(price));
        }

        let signed = side.sign() * quantity;
        self.position += signed;
        self.cash -= signed * price;
        self.fills += 1;

        Ok(Fill {
            side,
            quantity,
            price,
            cash: self.cash,
            position: self.position,
        })
    }
}

impl Default for Broker {
    fn default() -> Self {
        Broker {
            cash: DEFAULT_INITIAL_CASH,
            position: 0.0,
            fills: 0,
        }
    }
}

impl fmt::Display for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Broker(cash={:.2}, position={})", self.cash, self.position)
    }
}
