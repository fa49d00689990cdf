//! The trade simulation engine: a deterministic fold over a candle stream.
//!
//! Each [`apply_candle`] step is atomic and non-reentrant: validate the bar,
//! evaluate the open position for an exit, then (only if flat) evaluate the
//! entry signal, then update the ledger watermark and sample equity. A
//! position always closes fully before a new one can open on the same bar.
//!
//! Exit policy: when a bar touches both the stop and the target, the stop
//! wins. The candle gives no intrabar ordering, so this is the conservative
//! worst-case fill, applied to longs and shorts alike. Touch (`<=`/`>=`)
//! fills at the level.
//!
//! Everything the engine knows lives in [`EngineState`]; persisting it after
//! each step is all a live/paper caller needs to resume deterministically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candle::{Candle, CandleIssue, RejectedCandle};
use super::error::VolbreakError;
use super::ledger::Ledger;
use super::metrics::Metrics;
use super::params::StrategyParams;
use super::position::{ExitReason, Position, Side, Trade};
use super::signal::{Signal, SignalRule};

/// Candles per year for 4-hour bars.
pub const PERIODS_PER_YEAR_4H: f64 = 6.0 * 365.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_balance: f64,
    /// Below or at this balance the engine stops opening new positions.
    pub balance_floor: f64,
    /// Equity sampling frequency, used to annualize the Sharpe ratio.
    pub periods_per_year: f64,
    /// Sample equity every N applied bars.
    pub equity_sample_every: u64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_balance: 10_000.0,
            balance_floor: 0.0,
            periods_per_year: PERIODS_PER_YEAR_4H,
            equity_sample_every: 1,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), VolbreakError> {
        if !self.initial_balance.is_finite() || self.initial_balance <= 0.0 {
            return Err(VolbreakError::InvalidParam {
                field: "initial_balance",
                reason: "must be positive".to_string(),
            });
        }
        if !self.balance_floor.is_finite()
            || self.balance_floor < 0.0
            || self.balance_floor >= self.initial_balance
        {
            return Err(VolbreakError::InvalidParam {
                field: "balance_floor",
                reason: "must be non-negative and below initial_balance".to_string(),
            });
        }
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(VolbreakError::InvalidParam {
                field: "periods_per_year",
                reason: "must be positive".to_string(),
            });
        }
        if self.equity_sample_every == 0 {
            return Err(VolbreakError::InvalidParam {
                field: "equity_sample_every",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Complete engine state, serialized between polls in paper/live mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub ledger: Ledger,
    pub open_position: Option<Position>,
    pub last_timestamp: Option<DateTime<Utc>>,
    /// Close of the last valid bar; the forced-close fill price.
    pub last_close: Option<f64>,
    pub bars_seen: u64,
    /// Bars skipped for data-quality reasons, in stream order.
    pub rejected: Vec<RejectedCandle>,
}

impl EngineState {
    pub fn new(initial_balance: f64) -> Self {
        EngineState {
            ledger: Ledger::new(initial_balance),
            open_position: None,
            last_timestamp: None,
            last_close: None,
            bars_seen: 0,
            rejected: Vec::new(),
        }
    }

    /// Mark-to-market equity: balance plus unrealized P&L at `price`.
    pub fn equity_at(&self, price: f64) -> f64 {
        let unrealized = self
            .open_position
            .as_ref()
            .map(|p| p.unrealized_pnl(price))
            .unwrap_or(0.0);
        self.ledger.balance + unrealized
    }
}

/// Apply one candle. `history` is the prefix ending at the candle being
/// applied; the engine never reads past it.
///
/// Returns `false` when the bar was rejected for data-quality reasons, in
/// which case the caller should drop it from the history it hands to
/// subsequent calls (a rejected bar must not feed the signal window either).
pub fn apply_candle(
    state: &mut EngineState,
    history: &[Candle],
    rule: &dyn SignalRule,
    params: &StrategyParams,
    config: &BacktestConfig,
) -> bool {
    let Some(candle) = history.last() else {
        return false;
    };

    if let Some(last) = state.last_timestamp {
        if candle.timestamp <= last {
            let issue = if candle.timestamp == last {
                CandleIssue::DuplicateTimestamp
            } else {
                CandleIssue::OutOfOrderTimestamp
            };
            state.rejected.push(RejectedCandle {
                timestamp: candle.timestamp,
                issue,
            });
            return false;
        }
    }

    if let Err(issue) = candle.validate() {
        state.rejected.push(RejectedCandle {
            timestamp: candle.timestamp,
            issue,
        });
        // The stream continues past a bad bar; only evaluation is skipped.
        state.last_timestamp = Some(candle.timestamp);
        state.bars_seen += 1;
        return false;
    }

    // Exit first: the open position must resolve before any entry this bar.
    if let Some(position) = &state.open_position {
        if let Some((exit_price, reason)) = check_exit(position, candle, params) {
            close_position(state, exit_price, candle.timestamp, reason, params);
        }
    }

    if state.open_position.is_none() && !state.ledger.is_exhausted(config.balance_floor) {
        match rule.evaluate(history) {
            Signal::None => {}
            signal => open_position(state, signal, candle, params),
        }
    }

    state.ledger.update_watermark();

    state.bars_seen += 1;
    state.last_timestamp = Some(candle.timestamp);
    state.last_close = Some(candle.close);

    if state.bars_seen % config.equity_sample_every == 0 {
        let equity = state.equity_at(candle.close);
        state.ledger.record_equity(candle.timestamp, equity);
    }

    true
}

/// Close any open position at the last valid bar's close.
///
/// Called when the candle stream ends; the resulting trade is tagged
/// [`ExitReason::ForcedClose`].
pub fn force_close(state: &mut EngineState, params: &StrategyParams) {
    if state.open_position.is_none() {
        return;
    }
    if let (Some(timestamp), Some(close)) = (state.last_timestamp, state.last_close) {
        close_position(state, close, timestamp, ExitReason::ForcedClose, params);
        state.ledger.update_watermark();
    }
}

fn check_exit(
    position: &Position,
    candle: &Candle,
    params: &StrategyParams,
) -> Option<(f64, ExitReason)> {
    let stop = position.stop_level(params.stop_loss_pct);
    let target = position.target_level(params.take_profit_pct);

    match position.side {
        Side::Long => {
            if candle.low <= stop {
                Some((stop, ExitReason::StopLoss))
            } else if candle.high >= target {
                Some((target, ExitReason::TakeProfit))
            } else {
                None
            }
        }
        Side::Short => {
            if candle.high >= stop {
                Some((stop, ExitReason::StopLoss))
            } else if candle.low <= target {
                Some((target, ExitReason::TakeProfit))
            } else {
                None
            }
        }
    }
}

fn open_position(state: &mut EngineState, signal: Signal, candle: &Candle, params: &StrategyParams) {
    let side = match signal {
        Signal::Long => Side::Long,
        Signal::Short => Side::Short,
        Signal::None => return,
    };

    let notional = state.ledger.balance * params.position_size;
    state.ledger.deduct_entry_fee(notional * params.fee_rate);

    state.open_position = Some(Position {
        side,
        entry_price: candle.close,
        notional,
        leverage: params.leverage,
        entry_timestamp: candle.timestamp,
    });
}

fn close_position(
    state: &mut EngineState,
    exit_price: f64,
    exit_timestamp: DateTime<Utc>,
    exit_reason: ExitReason,
    params: &StrategyParams,
) {
    let Some(position) = state.open_position.take() else {
        return;
    };

    let raw_move = position.side.sign() * (exit_price - position.entry_price) / position.entry_price;
    let gross_pnl = raw_move * position.notional * position.leverage;
    let leg_fee = position.notional * params.fee_rate;

    // Entry leg was charged at open; only the exit leg settles here. The
    // trade record nets both legs so that summing net_pnl over the trade
    // list reproduces the balance change exactly.
    state.ledger.settle_close(gross_pnl - leg_fee);
    state.ledger.record_trade(Trade {
        side: position.side,
        entry_price: position.entry_price,
        exit_price,
        entry_timestamp: position.entry_timestamp,
        exit_timestamp,
        gross_pnl,
        fees: leg_fee * 2.0,
        net_pnl: gross_pnl - leg_fee * 2.0,
        exit_reason,
    });
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub state: EngineState,
    pub metrics: Metrics,
}

/// Run a complete backtest over a historical candle slice.
///
/// Validates parameters first, folds every candle through [`apply_candle`],
/// force-closes at the end of the stream, and computes metrics. Rejected
/// candles are reported on `state.rejected`, never silently dropped.
pub fn run_backtest(
    candles: &[Candle],
    rule: &dyn SignalRule,
    params: &StrategyParams,
    config: &BacktestConfig,
) -> Result<BacktestResult, VolbreakError> {
    params.validate()?;
    config.validate()?;

    let mut state = EngineState::new(config.initial_balance);
    let mut clean: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        clean.push(candle.clone());
        if !apply_candle(&mut state, &clean, rule, params, config) {
            clean.pop();
        }
    }
    force_close(&mut state, params);

    let metrics = Metrics::compute(&state.ledger, config.periods_per_year);
    Ok(BacktestResult { state, metrics })
}
