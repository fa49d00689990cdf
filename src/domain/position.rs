//! Open position and closed trade records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

/// The single open exposure. At most one exists at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    /// Fill price: the close of the signal candle.
    pub entry_price: f64,
    /// Dollars committed before leverage.
    pub notional: f64,
    pub leverage: f64,
    pub entry_timestamp: DateTime<Utc>,
}

impl Position {
    /// Price at which the stop-loss triggers.
    pub fn stop_level(&self, stop_loss_pct: f64) -> f64 {
        match self.side {
            Side::Long => self.entry_price * (1.0 - stop_loss_pct),
            Side::Short => self.entry_price * (1.0 + stop_loss_pct),
        }
    }

    /// Price at which the take-profit triggers.
    pub fn target_level(&self, take_profit_pct: f64) -> f64 {
        match self.side {
            Side::Long => self.entry_price * (1.0 + take_profit_pct),
            Side::Short => self.entry_price * (1.0 - take_profit_pct),
        }
    }

    /// Leveraged unrealized P&L at the given mark price, before fees.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        let raw_move = self.side.sign() * (price - self.entry_price) / self.entry_price;
        raw_move * self.notional * self.leverage
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    ForcedClose,
}

/// Closed position record. Appended exactly once per closure, never mutated.
///
/// `fees` covers both legs; `net_pnl = gross_pnl - fees`, so summing
/// `net_pnl` over the trade list reproduces the balance change exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_timestamp: DateTime<Utc>,
    pub exit_timestamp: DateTime<Utc>,
    pub gross_pnl: f64,
    pub fees: f64,
    pub net_pnl: f64,
    pub exit_reason: ExitReason,
}
