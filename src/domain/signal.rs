//! Entry signal evaluation.
//!
//! A [`SignalRule`] is a pure predicate over a candle-history prefix. It may
//! read the last candle's close and volume but nothing beyond the prefix, so
//! look-ahead is structurally impossible: the engine only ever hands it
//! `&candles[..=i]`.

use serde::{Deserialize, Serialize};

use super::candle::Candle;
use super::params::StrategyParams;

/// Directional entry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    None,
    Long,
    Short,
}

/// Pluggable entry predicate.
///
/// `history` ends at the candle under evaluation. Implementations must be
/// side-effect-free and must return the same value for a given prefix no
/// matter what follows it in the underlying array.
pub trait SignalRule {
    fn evaluate(&self, history: &[Candle]) -> Signal;
}

/// Reference rule: close breaks the N-bar high/low on elevated volume.
///
/// Over the `lookback` candles strictly preceding the current one, compute
/// the highest high, lowest low, and average volume. The rule fires only if
/// the current volume is at least `volume_multiplier` times the average;
/// then long on a close strictly above the highest high, short on a close
/// strictly below the lowest low. A close equal to the bound does not
/// trigger, and an average volume of zero never fires (the ratio would be
/// undefined, not infinitely large).
#[derive(Debug, Clone, PartialEq)]
pub struct BreakoutRule {
    pub lookback: usize,
    pub volume_multiplier: f64,
}

impl BreakoutRule {
    pub fn from_params(params: &StrategyParams) -> Self {
        BreakoutRule {
            lookback: params.lookback,
            volume_multiplier: params.volume_multiplier,
        }
    }
}

impl SignalRule for BreakoutRule {
    fn evaluate(&self, history: &[Candle]) -> Signal {
        let n = history.len();
        if n < self.lookback + 1 {
            return Signal::None;
        }

        let current = &history[n - 1];
        let window = &history[n - 1 - self.lookback..n - 1];

        let mut highest_high = f64::MIN;
        let mut lowest_low = f64::MAX;
        let mut volume_sum = 0.0;
        for candle in window {
            highest_high = highest_high.max(candle.high);
            lowest_low = lowest_low.min(candle.low);
            volume_sum += candle.volume;
        }
        let average_volume = volume_sum / self.lookback as f64;

        if average_volume <= 0.0 || current.volume < average_volume * self.volume_multiplier {
            return Signal::None;
        }

        if current.close > highest_high {
            Signal::Long
        } else if current.close < lowest_low {
            Signal::Short
        } else {
            Signal::None
        }
    }
}
