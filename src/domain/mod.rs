//! Core engine logic: candles in, trades and metrics out.

pub mod candle;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod params;
pub mod position;
pub mod signal;
pub mod sweep;
