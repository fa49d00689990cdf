//! Account ledger: balance, running peak, drawdown, trade log, equity curve.
//!
//! Balance mutates in exactly two places: the entry-fee deduction at
//! position open and the settlement at position close. The peak is a
//! running maximum of realized balance, and drawdown is always measured
//! against the highest balance seen so far, never a future maximum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::Trade;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub balance: f64,
    pub initial_balance: f64,
    pub peak_balance: f64,
    pub max_drawdown_pct: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Ledger {
    pub fn new(initial_balance: f64) -> Self {
        Ledger {
            balance: initial_balance,
            initial_balance,
            peak_balance: initial_balance,
            max_drawdown_pct: 0.0,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    /// Entry-leg fee, charged when a position opens.
    pub fn deduct_entry_fee(&mut self, fee: f64) {
        self.balance -= fee;
    }

    /// Settlement at close: gross P&L minus the exit-leg fee.
    pub fn settle_close(&mut self, amount: f64) {
        self.balance += amount;
    }

    pub fn record_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    /// Advance the running peak and drawdown from the current balance.
    pub fn update_watermark(&mut self) {
        if self.balance > self.peak_balance {
            self.peak_balance = self.balance;
        } else if self.peak_balance > 0.0 {
            let drawdown = (self.peak_balance - self.balance) / self.peak_balance;
            if drawdown > self.max_drawdown_pct {
                self.max_drawdown_pct = drawdown;
            }
        }
    }

    /// Append an equity sample. Samples must arrive in time order; a stale
    /// timestamp is dropped rather than corrupting the curve.
    pub fn record_equity(&mut self, timestamp: DateTime<Utc>, equity: f64) {
        if let Some(last) = self.equity_curve.last() {
            if timestamp <= last.timestamp {
                return;
            }
        }
        self.equity_curve.push(EquityPoint { timestamp, equity });
    }

    /// Account-blown guardrail: at or below the floor, no new entries.
    pub fn is_exhausted(&self, floor: f64) -> bool {
        self.balance <= floor
    }

    pub fn realized_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.net_pnl).sum()
    }
}
