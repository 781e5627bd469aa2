//! Domain error types.

use chrono::NaiveDate;

/// Rejection raised by the broker before any state is touched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("invalid order: quantity {0} is negative")]
    NegativeQuantity(f64),

    #[error("invalid order: quantity {0} is not a finite number")]
    InvalidQuantity(f64),

    #[error("invalid order: price {0} is not a finite non-negative number")]
    InvalidPrice(f64),
}

/// Top-level error type for barlag.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("step {index} ({date}): {source}")]
    InvalidOrder {
        index: usize,
        date: NaiveDate,
        #[source]
        source: OrderError,
    },

    #[error("step {index} ({date}): price {price} cannot be executed or marked")]
    InvalidPrice {
        index: usize,
        date: NaiveDate,
        price: f64,
    },

    #[error("invalid configuration {key}: {reason}")]
    InvalidConfiguration { key: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("price data error: {reason}")]
    PriceData { reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    pub(crate) fn config(key: &str, reason: impl Into<String>) -> Self {
        BacktestError::InvalidConfiguration {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn data(reason: impl Into<String>) -> Self {
        BacktestError::PriceData {
            reason: reason.into(),
        }
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) => 1,
            BacktestError::InvalidConfiguration { .. } | BacktestError::ConfigParse { .. } => 2,
            BacktestError::PriceData { .. } | BacktestError::Csv(_) => 3,
            BacktestError::InvalidPrice { .. } => 4,
            BacktestError::InvalidOrder { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
