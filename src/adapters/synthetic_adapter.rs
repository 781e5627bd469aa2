//! Seeded synthetic prices exposed as a [`PriceSource`].

use crate::domain::error::BacktestError;
use crate::domain::generator::PriceGenerator;
use crate::domain::price::PriceSeries;
use crate::ports::price_port::PriceSource;

pub struct SyntheticSource {
    generator: PriceGenerator,
    num_ticks: usize,
}

impl SyntheticSource {
    pub fn new(generator: PriceGenerator, num_ticks: usize) -> Self {
        Self {
            generator,
            num_ticks,
        }
    }
}

impl PriceSource for SyntheticSource {
    fn load_prices(&self) -> Result<PriceSeries, BacktestError> {
        self.generator.series(self.num_ticks)
    }

    fn describe(&self) -> String {
        format!(
            "synthetic:{} start={} vol={} seed={} ticks={}",
            self.generator.symbol,
            self.generator.start_price,
            self.generator.volatility,
            self.generator.seed,
            self.num_ticks
        )
    }
}
