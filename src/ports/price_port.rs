//! Price source port trait.

use crate::domain::error::BacktestError;
use crate::domain::price::PriceSeries;

/// Anything that can hand the engine a complete, ordered price series.
pub trait PriceSource {
    fn load_prices(&self) -> Result<PriceSeries, BacktestError>;

    /// Short human-readable origin, used in log lines.
    fn describe(&self) -> String;
}
