//! Synthetic daily price generator.
//!
//! Multiplicative random walk: P[k] = P[k-1] * (1 + e[k]), e ~ N(0, volatility).
//! Prices are rounded to cents and floored at one cent. The walk is driven by
//! a seeded `StdRng`, so the same parameters always give the same series.

use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::domain::error::BacktestError;
use crate::domain::price::PriceSeries;

const MIN_PRICE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceGenerator {
    pub symbol: String,
    pub start_price: f64,
    pub volatility: f64,
    pub seed: u64,
    pub start_date: NaiveDate,
}

impl PriceGenerator {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if !self.start_price.is_finite() || self.start_price <= 0.0 {
            return Err(BacktestError::config(
                "start_price",
                "start_price must be a finite positive number",
            ));
        }
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(BacktestError::config(
                "volatility",
                "volatility must be a finite non-negative number",
            ));
        }
        Ok(())
    }

    /// `count` prices, the first already one step away from `start_price`.
    pub fn prices(&self, count: usize) -> Result<Vec<f64>, BacktestError> {
        self.validate()?;
        let normal = Normal::new(0.0, self.volatility)
            .map_err(|e| BacktestError::config("volatility", e.to_string()))?;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut price = self.start_price;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let shock = normal.sample(&mut rng);
            price = round_cents(price * (1.0 + shock)).max(MIN_PRICE);
            out.push(price);
        }
        Ok(out)
    }

    /// One bar per calendar day starting at `start_date`.
    pub fn series(&self, count: usize) -> Result<PriceSeries, BacktestError> {
        let prices = self.prices(count)?;
        PriceSeries::daily(&self.symbol, self.start_date, &prices)
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(volatility: f64, seed: u64) -> PriceGenerator {
        PriceGenerator {
            symbol: "AAPL".into(),
            start_price: 150.0,
            volatility,
            seed,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }
    }

    fn stddev(values: &[f64]) -> f64 {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
    }

    #[test]
    fn same_seed_same_series() {
        let a = generator(0.02, 42).prices(100).unwrap();
        let b = generator(0.02, 42).prices(100).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seed_different_series() {
        let a = generator(0.02, 1).prices(50).unwrap();
        let b = generator(0.02, 2).prices(50).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn prices_move_and_stay_positive() {
        let prices = generator(0.01, 7).prices(200).unwrap();
        assert_eq!(prices.len(), 200);
        assert!(prices.iter().all(|p| *p > 0.0));
        assert!(prices.iter().any(|p| *p != prices[0]));
    }

    #[test]
    fn prices_are_rounded_to_cents() {
        for p in generator(0.03, 9).prices(50).unwrap() {
            assert!((p * 100.0 - (p * 100.0).round()).abs() < 1e-6);
        }
    }

    #[test]
    fn zero_volatility_is_constant() {
        let prices = generator(0.0, 3).prices(10).unwrap();
        assert!(prices.iter().all(|p| *p == 150.0));
    }

    #[test]
    fn higher_volatility_spreads_more() {
        let low = generator(0.001, 11).prices(200).unwrap();
        let high = generator(0.1, 11).prices(200).unwrap();
        assert!(stddev(&high) > stddev(&low));
    }

    #[test]
    fn series_has_daily_dates() {
        let series = generator(0.02, 5).series(3).unwrap();
        assert_eq!(series.symbol(), "AAPL");
        assert_eq!(
            series.dates()[2],
            NaiveDate::from_ymd_opt(2025, 1, 3).unwrap()
        );
    }

    #[test]
    fn rejects_bad_parameters() {
        let mut g = generator(0.02, 1);
        g.start_price = 0.0;
        assert!(g.prices(5).is_err());

        let mut g = generator(-0.5, 1);
        assert!(g.prices(5).is_err());
        g.volatility = f64::NAN;
        assert!(g.validate().is_err());
    }
}
