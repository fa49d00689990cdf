//! Performance metrics derived from the trade list and equity samples.
//!
//! [`Metrics::compute`] is a pure function of the ledger: calling it twice
//! on the same ledger yields identical output, and nothing here mutates or
//! caches state.

use serde::{Deserialize, Serialize};

use super::ledger::{EquityPoint, Ledger};

/// Sentinel reported when every closed trade was a winner; an infinite
/// profit factor is useless in reports and spreadsheets.
pub const PROFIT_FACTOR_CAP: f64 = 99.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_return: f64,
    pub sharpe_ratio: f64,
    /// Taken from the ledger's running value; reflects the path, not just
    /// the endpoints.
    pub max_drawdown_pct: f64,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub expectancy: f64,
}

impl Metrics {
    pub fn compute(ledger: &Ledger, periods_per_year: f64) -> Self {
        let total_return = if ledger.initial_balance > 0.0 {
            (ledger.balance - ledger.initial_balance) / ledger.initial_balance
        } else {
            0.0
        };

        let sharpe_ratio = compute_sharpe(&ledger.equity_curve, periods_per_year);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        for trade in &ledger.trades {
            let pnl = trade.net_pnl;
            if pnl > 0.0 {
                trades_won += 1;
                gross_profit += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                gross_loss += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            }
        }

        let total_trades = ledger.trades.len();
        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            PROFIT_FACTOR_CAP
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            gross_profit / trades_won as f64
        } else {
            0.0
        };

        let avg_loss = if trades_lost > 0 {
            gross_loss / trades_lost as f64
        } else {
            0.0
        };

        let expectancy = win_rate * avg_win - (1.0 - win_rate) * avg_loss;

        Metrics {
            total_return,
            sharpe_ratio,
            max_drawdown_pct: ledger.max_drawdown_pct,
            total_trades,
            trades_won,
            trades_lost,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            expectancy,
        }
    }
}

/// Mean periodic return over its standard deviation, annualized by the
/// sampling frequency. Zero with fewer than two returns or zero variance.
fn compute_sharpe(equity_curve: &[EquityPoint], periods_per_year: f64) -> f64 {
    if equity_curve.len() < 3 {
        // Fewer than 2 return samples.
        return 0.0;
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        (mean / stddev) * periods_per_year.sqrt()
    } else {
        0.0
    }
}
