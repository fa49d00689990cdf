//! OHLCV candle representation and data-quality checks.
//!
//! A candle stream is strictly time-ordered with no duplicate timestamps.
//! A single malformed bar is rejected from evaluation and recorded as a
//! [`RejectedCandle`] diagnostic; it never aborts a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Check internal consistency of a single bar.
    ///
    /// Ordering relative to the rest of the stream is the engine's job;
    /// this only looks at the bar itself.
    pub fn validate(&self) -> Result<(), CandleIssue> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(CandleIssue::NonFinitePrice);
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(CandleIssue::NegativeVolume);
        }
        if self.high < self.low {
            return Err(CandleIssue::InvertedRange);
        }
        if self.high < self.open.max(self.close) || self.low > self.open.min(self.close) {
            return Err(CandleIssue::RangeViolation);
        }
        Ok(())
    }
}

/// Why a candle was rejected from evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandleIssue {
    #[error("non-finite price field")]
    NonFinitePrice,
    #[error("negative or non-finite volume")]
    NegativeVolume,
    #[error("high below low")]
    InvertedRange,
    #[error("open/close outside high-low range")]
    RangeViolation,
    #[error("timestamp not after previous candle")]
    OutOfOrderTimestamp,
    #[error("duplicate timestamp")]
    DuplicateTimestamp,
}

/// Diagnostic record for a bar that was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedCandle {
    pub timestamp: DateTime<Utc>,
    pub issue: CandleIssue,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn sample_candle() -> Candle {
        Candle {
            timestamp: ts(0),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn valid_candle_passes() {
        assert!(sample_candle().validate().is_ok());
    }

    #[test]
    fn non_finite_price_rejected() {
        let mut c = sample_candle();
        c.close = f64::NAN;
        assert_eq!(c.validate(), Err(CandleIssue::NonFinitePrice));

        let mut c = sample_candle();
        c.high = f64::INFINITY;
        assert_eq!(c.validate(), Err(CandleIssue::NonFinitePrice));
    }

    #[test]
    fn negative_volume_rejected() {
        let mut c = sample_candle();
        c.volume = -1.0;
        assert_eq!(c.validate(), Err(CandleIssue::NegativeVolume));
    }

    #[test]
    fn nan_volume_rejected() {
        let mut c = sample_candle();
        c.volume = f64::NAN;
        assert_eq!(c.validate(), Err(CandleIssue::NegativeVolume));
    }

    #[test]
    fn zero_volume_allowed() {
        let mut c = sample_candle();
        c.volume = 0.0;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn inverted_range_rejected() {
        let mut c = sample_candle();
        c.high = 80.0;
        c.low = 120.0;
        c.open = 100.0;
        c.close = 100.0;
        assert_eq!(c.validate(), Err(CandleIssue::InvertedRange));
    }

    #[test]
    fn close_above_high_rejected() {
        let mut c = sample_candle();
        c.close = 111.0;
        assert_eq!(c.validate(), Err(CandleIssue::RangeViolation));
    }

    #[test]
    fn open_below_low_rejected() {
        let mut c = sample_candle();
        c.open = 89.0;
        assert_eq!(c.validate(), Err(CandleIssue::RangeViolation));
    }

    #[test]
    fn doji_at_bounds_allowed() {
        let c = Candle {
            timestamp: ts(0),
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0,
            volume: 10.0,
        };
        assert!(c.validate().is_ok());
    }
}
