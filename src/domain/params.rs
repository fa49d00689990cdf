//! Strategy parameters.
//!
//! All percentage-style fields are fractions (0.03 = 3%), not percent
//! points. Validation is fail-fast: a bad parameter set is a config error
//! caught before any candle is processed.

use serde::{Deserialize, Serialize};

use super::error::VolbreakError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Breakout window: bars strictly preceding the current one.
    pub lookback: usize,
    /// Current volume must be at least this multiple of the window average.
    pub volume_multiplier: f64,
    /// Stop distance from entry, as a fraction of entry price.
    pub stop_loss_pct: f64,
    /// Target distance from entry, as a fraction of entry price.
    pub take_profit_pct: f64,
    /// Fraction of balance committed per trade.
    pub position_size: f64,
    /// Multiplier on the percentage price move when computing P&L.
    pub leverage: f64,
    /// Fee charged on each leg, as a fraction of notional.
    pub fee_rate: f64,
}

impl StrategyParams {
    /// Preset used by the 4-hour breakout runs.
    pub fn preset_4h_breakout() -> Self {
        StrategyParams {
            lookback: 20,
            volume_multiplier: 2.0,
            stop_loss_pct: 0.03,
            take_profit_pct: 0.06,
            position_size: 0.25,
            leverage: 3.0,
            fee_rate: 0.0006,
        }
    }

    pub fn validate(&self) -> Result<(), VolbreakError> {
        if self.lookback == 0 {
            return Err(invalid("lookback", "must be greater than zero"));
        }
        if !self.volume_multiplier.is_finite() || self.volume_multiplier < 0.0 {
            return Err(invalid("volume_multiplier", "must be non-negative"));
        }
        if !self.stop_loss_pct.is_finite()
            || self.stop_loss_pct <= 0.0
            || self.stop_loss_pct >= 1.0
        {
            return Err(invalid("stop_loss_pct", "must be between 0 and 1 exclusive"));
        }
        if !self.take_profit_pct.is_finite() || self.take_profit_pct <= 0.0 {
            return Err(invalid("take_profit_pct", "must be positive"));
        }
        if !self.position_size.is_finite()
            || self.position_size <= 0.0
            || self.position_size > 1.0
        {
            return Err(invalid("position_size", "must be in (0, 1]"));
        }
        if !self.leverage.is_finite() || self.leverage < 1.0 {
            return Err(invalid("leverage", "must be at least 1"));
        }
        if !self.fee_rate.is_finite() || self.fee_rate < 0.0 {
            return Err(invalid("fee_rate", "must be non-negative"));
        }
        Ok(())
    }
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams::preset_4h_breakout()
    }
}

fn invalid(field: &'static str, reason: &str) -> VolbreakError {
    VolbreakError::InvalidParam {
        field,
        reason: reason.to_string(),
    }
}
