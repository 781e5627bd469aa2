//! Single-instrument daily price series.

use chrono::NaiveDate;

use crate::domain::error::BacktestError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    /// NaN marks a missing observation.
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        PricePoint { date, price }
    }

    pub fn is_missing(&self) -> bool {
        self.price.is_nan()
    }
}

/// Immutable, strictly date-ordered price series.
///
/// Dates and prices are kept in parallel so the price column can be handed
/// to signal generators as a plain slice.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    dates: Vec<NaiveDate>,
    prices: Vec<f64>,
}

impl PriceSeries {
    /// Builds a series, rejecting out-of-order or duplicate dates and prices
    /// that are negative or infinite. NaN is kept as a missing marker.
    pub fn new(symbol: &str, points: Vec<PricePoint>) -> Result<Self, BacktestError> {
        let mut dates = Vec::with_capacity(points.len());
        let mut prices = Vec::with_capacity(points.len());

        for (i, point) in points.into_iter().enumerate() {
            if let Some(prev) = dates.last() {
                if point.date <= *prev {
                    return Err(BacktestError::data(format!(
                        "row {}: date {} does not follow {}",
                        i, point.date, prev
                    )));
                }
            }
            if point.price.is_infinite() || point.price < 0.0 {
                return Err(BacktestError::data(format!(
                    "row {}: price {} on {} must be finite and non-negative",
                    i, point.price, point.date
                )));
            }
            dates.push(point.date);
            prices.push(point.price);
        }

        Ok(PriceSeries {
            symbol: symbol.to_string(),
            dates,
            prices,
        })
    }

    /// Convenience constructor with one bar per calendar day from `start`.
    pub fn daily(symbol: &str, start: NaiveDate, prices: &[f64]) -> Result<Self, BacktestError> {
        let points = prices
            .iter()
            .zip(start.iter_days())
            .map(|(&price, date)| PricePoint::new(date, price))
            .collect();
        Self::new(symbol, points)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn get(&self, index: usize) -> Option<PricePoint> {
        Some(PricePoint::new(
            *self.dates.get(index)?,
            *self.prices.get(index)?,
        ))
    }

    pub fn iter(&self) -> impl Iterator<Item = PricePoint> + '_ {
        self.dates
            .iter()
            .zip(&self.prices)
            .map(|(&date, &price)| PricePoint::new(date, price))
    }

    pub fn missing_count(&self) -> usize {
        self.iter().filter(|p| p.is_missing()).count()
    }
}
