//! Discrete trading signal.

use std::fmt;

/// Trading intent derived from price history only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Buy,
    Hold,
    Sell,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::Buy, Signal::Hold, Signal::Sell];

    /// +1 / 0 / -1
    pub fn value(self) -> i8 {
        match self {
            Signal::Buy => 1,
            Signal::Hold => 0,
            Signal::Sell => -1,
        }
    }

    pub fn from_value(value: i8) -> Option<Signal> {
        match value {
            1 => Some(Signal::Buy),
            0 => Some(Signal::Hold),
            -1 => Some(Signal::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Hold => write!(f, "HOLD"),
            Signal::Sell => write!(f, "SELL"),
        }
    }
}
