#![allow(dead_code)]

use chrono::{DateTime, Utc};
use volbreak::domain::candle::Candle;
use volbreak::domain::engine::BacktestConfig;
use volbreak::domain::error::VolbreakError;
use volbreak::domain::params::StrategyParams;
use volbreak::ports::data_port::CandleFeed;

/// 4-hour bar timestamps: index `i` is `i * 4h` after the epoch.
pub fn ts(i: usize) -> DateTime<Utc> {
    DateTime::from_timestamp(i as i64 * 4 * 3600, 0).unwrap()
}

pub fn candle(i: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
    Candle {
        timestamp: ts(i),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// A flat bar that never breaks out: range 99-101, close 100, volume 10.
pub fn quiet(i: usize) -> Candle {
    candle(i, 100.0, 101.0, 99.0, 100.0, 10.0)
}

/// `n` quiet bars starting at index 0.
pub fn quiet_series(n: usize) -> Vec<Candle> {
    (0..n).map(quiet).collect()
}

/// Quiet warm-up followed by an upside breakout bar closing at 105 on
/// five times the average volume. With `test_params(lookback)` this
/// opens a long at 105 (stop 101.85, target 111.3).
pub fn breakout_series(lookback: usize) -> Vec<Candle> {
    let mut candles = quiet_series(lookback);
    candles.push(candle(lookback, 100.0, 106.0, 100.0, 105.0, 50.0));
    candles
}

pub fn test_params(lookback: usize) -> StrategyParams {
    StrategyParams {
        lookback,
        volume_multiplier: 2.0,
        stop_loss_pct: 0.03,
        take_profit_pct: 0.06,
        position_size: 0.25,
        leverage: 3.0,
        fee_rate: 0.0006,
    }
}

pub fn test_config() -> BacktestConfig {
    BacktestConfig {
        initial_balance: 10_000.0,
        ..BacktestConfig::default()
    }
}

/// In-memory candle feed for paper-loop tests.
pub struct MockFeed {
    candles: Vec<Candle>,
    cursor: usize,
}

impl MockFeed {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles, cursor: 0 }
    }
}

impl CandleFeed for MockFeed {
    fn fetch_candles(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>, VolbreakError> {
        Ok(self
            .candles
            .iter()
            .filter(|c| start.is_none_or(|s| c.timestamp >= s))
            .filter(|c| end.is_none_or(|e| c.timestamp <= e))
            .cloned()
            .collect())
    }

    fn poll_next(&mut self) -> Result<Option<Candle>, VolbreakError> {
        let next = self.candles.get(self.cursor).cloned();
        if next.is_some() {
            self.cursor += 1;
        }
        Ok(next)
    }
}
