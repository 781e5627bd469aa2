//! Result persistence port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;

/// Port for writing a finished run somewhere downstream tools can read it.
pub trait ResultSink {
    fn write(&self, result: &BacktestResult) -> Result<(), BacktestError>;
}
