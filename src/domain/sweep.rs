//! Parameter sweep: many independent backtests over the same candle slice.
//!
//! Each combination is a read-only pass with its own ledger and position,
//! so the grid fans out across a rayon pool with no shared mutable state.
//! The cancel flag is checked between combinations, never mid-candle, and
//! results come back in grid order regardless of scheduling.

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

use super::candle::Candle;
use super::engine::{run_backtest, BacktestConfig};
use super::error::VolbreakError;
use super::metrics::Metrics;
use super::params::StrategyParams;
use super::signal::BreakoutRule;

/// Axes of the grid. Each axis replaces the corresponding field of a base
/// parameter set; the remaining fields come from the base unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    pub lookbacks: Vec<usize>,
    pub volume_multipliers: Vec<f64>,
    pub stop_loss_pcts: Vec<f64>,
    pub take_profit_pcts: Vec<f64>,
}

impl ParamGrid {
    /// Grid used by the monthly 4-hour sweep runs.
    pub fn default_4h() -> Self {
        ParamGrid {
            lookbacks: vec![10, 20, 30],
            volume_multipliers: vec![1.5, 2.0, 2.5],
            stop_loss_pcts: vec![0.02, 0.03, 0.05],
            take_profit_pcts: vec![0.04, 0.06, 0.10],
        }
    }

    /// Expand the cartesian product over a base parameter set, dropping
    /// combinations that fail validation.
    pub fn generate(&self, base: &StrategyParams) -> Vec<StrategyParams> {
        let mut combos = Vec::new();
        for &lookback in &self.lookbacks {
            for &volume_multiplier in &self.volume_multipliers {
                for &stop_loss_pct in &self.stop_loss_pcts {
                    for &take_profit_pct in &self.take_profit_pcts {
                        let params = StrategyParams {
                            lookback,
                            volume_multiplier,
                            stop_loss_pct,
                            take_profit_pct,
                            ..base.clone()
                        };
                        if params.validate().is_ok() {
                            combos.push(params);
                        }
                    }
                }
            }
        }
        combos
    }

    pub fn size(&self) -> usize {
        self.lookbacks.len()
            * self.volume_multipliers.len()
            * self.stop_loss_pcts.len()
            * self.take_profit_pcts.len()
    }
}

/// One completed combination.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    pub params: StrategyParams,
    pub metrics: Metrics,
    pub rejected_candles: usize,
}

/// Run every combination of `grid` over `candles`.
///
/// Combinations still pending when `cancel` flips to true are skipped; the
/// ones already finished are returned, so a cancelled sweep yields a valid
/// (shorter) result set rather than a torn one.
pub fn run_sweep(
    candles: &[Candle],
    grid: &ParamGrid,
    base: &StrategyParams,
    config: &BacktestConfig,
    cancel: &AtomicBool,
) -> Result<Vec<SweepOutcome>, VolbreakError> {
    config.validate()?;

    let combos = grid.generate(base);
    let outcomes: Vec<SweepOutcome> = combos
        .par_iter()
        .filter_map(|params| {
            if cancel.load(Ordering::Relaxed) {
                return None;
            }
            let rule = BreakoutRule::from_params(params);
            let result = run_backtest(candles, &rule, params, config).ok()?;
            Some(SweepOutcome {
                params: params.clone(),
                metrics: result.metrics,
                rejected_candles: result.state.rejected.len(),
            })
        })
        .collect();

    Ok(outcomes)
}

/// Sort outcomes best-first by total return, ties broken by drawdown.
pub fn rank_by_return(outcomes: &mut [SweepOutcome]) {
    outcomes.sort_by(|a, b| {
        b.metrics
            .total_return
            .partial_cmp(&a.metrics.total_return)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.metrics
                    .max_drawdown_pct
                    .partial_cmp(&b.metrics.max_drawdown_pct)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
}
