//! Run summary statistics.

use crate::domain::backtest::{BacktestResult, BacktestRow};
use crate::domain::broker::Side;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub initial_equity: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub final_position: f64,
    pub final_cash: f64,
    pub fills: usize,
    pub buys: usize,
    pub sells: usize,
    pub bars: usize,
}

impl Summary {
    pub fn compute(result: &BacktestResult) -> Self {
        let initial_equity = result
            .rows
            .first()
            .map(|r| result.initial_cash + result.initial_position * r.price)
            .unwrap_or(result.initial_cash);
        let final_equity = result.final_equity();

        let total_return = if initial_equity > 0.0 {
            (final_equity - initial_equity) / initial_equity
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&result.rows);

        let mut buys = 0usize;
        let mut sells = 0usize;
        for fill in result.fills() {
            match fill.side {
                Side::Buy => buys += 1,
                Side::Sell => sells += 1,
            }
        }

        let (final_position, final_cash) = result
            .last()
            .map(|r| (r.position, r.cash))
            .unwrap_or((result.initial_position, result.initial_cash));

        Summary {
            initial_equity,
            final_equity,
            total_return,
            max_drawdown,
            max_drawdown_duration,
            final_position,
            final_cash,
            fills: buys + sells,
            buys,
            sells,
            bars: result.len(),
        }
    }
}

/// Largest peak-to-trough fall as a fraction of the peak, and the longest
/// run of bars spent below a peak.
fn compute_drawdown(rows: &[BacktestRow]) -> (f64, usize) {
    let Some(first) = rows.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_duration = 0usize;
    let mut current_duration = 0usize;

    for row in rows {
        if row.equity >= peak {
            peak = row.equity;
            current_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - row.equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_duration += 1;
            max_duration = max_duration.max(current_duration);
        }
    }

    (max_dd, max_duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{run_backtest, BacktestConfig};
    use crate::domain::price::PriceSeries;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn run(prices: &[f64], window: usize) -> BacktestResult {
        let series =
            PriceSeries::daily("TEST", NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), prices)
                .unwrap();
        let config = BacktestConfig {
            window,
            initial_cash: 1_000.0,
            ..Default::default()
        };
        run_backtest(&series, &config).unwrap()
    }

    #[test]
    fn empty_result() {
        let s = Summary::compute(&run(&[], 2));
        assert_relative_eq!(s.initial_equity, 1_000.0);
        assert_relative_eq!(s.final_equity, 1_000.0);
        assert_eq!(s.total_return, 0.0);
        assert_eq!(s.max_drawdown, 0.0);
        assert_eq!(s.fills, 0);
        assert_eq!(s.bars, 0);
    }

    #[test]
    fn flat_prices_no_trades() {
        let s = Summary::compute(&run(&[10.0; 6], 3));
        assert_eq!(s.fills, 0);
        assert_eq!(s.total_return, 0.0);
        assert_eq!(s.final_position, 0.0);
        assert_relative_eq!(s.final_cash, 1_000.0);
    }

    #[test]
    fn counts_sides_and_return() {
        let s = Summary::compute(&run(&[10.0, 10.0, 10.0, 12.0, 8.0, 9.0], 3));
        assert_eq!(s.buys, 1);
        assert_eq!(s.sells, 1);
        assert_eq!(s.fills, 2);
        assert_relative_eq!(s.final_equity, 1_001.0);
        assert_relative_eq!(s.total_return, 0.001);
        assert_eq!(s.bars, 6);
    }

    #[test]
    fn drawdown_from_peak() {
        // Long from bar 2 at 2.0, then price falls.
        let s = Summary::compute(&run(&[1.0, 2.0, 2.0, 1.0, 1.0], 2));
        assert!(s.max_drawdown > 0.0);
        assert!(s.max_drawdown_duration >= 1);
    }
}
