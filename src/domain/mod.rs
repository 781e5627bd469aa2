//! Core domain types and logic.

pub mod signal;
pub mod moving_average;
pub mod strategy;
pub mod broker;
pub mod price;
pub mod backtest;
pub mod metrics;
pub mod generator;
pub mod config_validation;
pub mod error;
