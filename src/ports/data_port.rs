//! Candle supply port trait.
//!
//! Backtest mode calls [`CandleFeed::fetch_candles`] once for the whole
//! slice; paper/live mode calls [`CandleFeed::poll_next`] per tick. Any
//! network timeout or retry behavior belongs behind this trait, not in the
//! engine.

use chrono::{DateTime, Utc};

use crate::domain::candle::Candle;
use crate::domain::error::VolbreakError;

pub trait CandleFeed {
    /// Full historical slice, optionally bounded.
    fn fetch_candles(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>, VolbreakError>;

    /// Next completed bar, or `None` when the feed is drained.
    fn poll_next(&mut self) -> Result<Option<Candle>, VolbreakError>;
}
