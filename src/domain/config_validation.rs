//! Configuration loading and validation.
//!
//! Every field is checked before a run starts; a bad value is a
//! [`VolbreakError::ConfigInvalid`], never a runtime surprise. Strategy
//! parameters additionally pass through [`StrategyParams::validate`] so the
//! CLI and the library enforce identical bounds.

use crate::domain::engine::{BacktestConfig, PERIODS_PER_YEAR_4H};
use crate::domain::error::VolbreakError;
use crate::domain::params::StrategyParams;
use crate::domain::sweep::ParamGrid;
use crate::ports::config_port::ConfigPort;

/// Build and validate [`StrategyParams`] from the `[strategy]` section.
pub fn load_strategy_params(config: &dyn ConfigPort) -> Result<StrategyParams, VolbreakError> {
    let defaults = StrategyParams::default();

    let lookback = config.get_int("strategy", "lookback", defaults.lookback as i64);
    if lookback <= 0 {
        return Err(invalid("strategy", "lookback", "must be greater than zero"));
    }

    let params = StrategyParams {
        lookback: lookback as usize,
        volume_multiplier: config.get_double(
            "strategy",
            "volume_multiplier",
            defaults.volume_multiplier,
        ),
        stop_loss_pct: config.get_double("strategy", "stop_loss_pct", defaults.stop_loss_pct),
        take_profit_pct: config.get_double(
            "strategy",
            "take_profit_pct",
            defaults.take_profit_pct,
        ),
        position_size: config.get_double("strategy", "position_size", defaults.position_size),
        leverage: config.get_double("strategy", "leverage", defaults.leverage),
        fee_rate: config.get_double("strategy", "fee_rate", defaults.fee_rate),
    };

    params.validate().map_err(|e| match e {
        VolbreakError::InvalidParam { field, reason } => VolbreakError::ConfigInvalid {
            section: "strategy".to_string(),
            key: field.to_string(),
            reason,
        },
        other => other,
    })?;

    Ok(params)
}

/// Build and validate [`BacktestConfig`] from the `[backtest]` section.
pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, VolbreakError> {
    let initial_balance = config.get_double("backtest", "initial_balance", 10_000.0);
    if initial_balance <= 0.0 {
        return Err(invalid("backtest", "initial_balance", "must be positive"));
    }

    let balance_floor = config.get_double("backtest", "balance_floor", 0.0);
    if balance_floor < 0.0 || balance_floor >= initial_balance {
        return Err(invalid(
            "backtest",
            "balance_floor",
            "must be non-negative and below initial_balance",
        ));
    }

    let periods_per_year = config.get_double("backtest", "periods_per_year", PERIODS_PER_YEAR_4H);
    if periods_per_year <= 0.0 {
        return Err(invalid("backtest", "periods_per_year", "must be positive"));
    }

    let equity_sample_every = config.get_int("backtest", "equity_sample_every", 1);
    if equity_sample_every <= 0 {
        return Err(invalid(
            "backtest",
            "equity_sample_every",
            "must be at least 1",
        ));
    }

    Ok(BacktestConfig {
        initial_balance,
        balance_floor,
        periods_per_year,
        equity_sample_every: equity_sample_every as u64,
    })
}

/// Build the sweep grid from the `[sweep]` section; absent keys fall back
/// to the default 4-hour grid axis by axis.
pub fn load_param_grid(config: &dyn ConfigPort) -> Result<ParamGrid, VolbreakError> {
    let defaults = ParamGrid::default_4h();

    let lookbacks = match config.get_string("sweep", "lookbacks") {
        Some(raw) => parse_usize_list("sweep", "lookbacks", &raw)?,
        None => defaults.lookbacks,
    };
    let volume_multipliers = match config.get_string("sweep", "volume_multipliers") {
        Some(raw) => parse_f64_list("sweep", "volume_multipliers", &raw)?,
        None => defaults.volume_multipliers,
    };
    let stop_loss_pcts = match config.get_string("sweep", "stop_loss_pcts") {
        Some(raw) => parse_f64_list("sweep", "stop_loss_pcts", &raw)?,
        None => defaults.stop_loss_pcts,
    };
    let take_profit_pcts = match config.get_string("sweep", "take_profit_pcts") {
        Some(raw) => parse_f64_list("sweep", "take_profit_pcts", &raw)?,
        None => defaults.take_profit_pcts,
    };

    let grid = ParamGrid {
        lookbacks,
        volume_multipliers,
        stop_loss_pcts,
        take_profit_pcts,
    };
    if grid.size() == 0 {
        return Err(invalid("sweep", "grid", "at least one value per axis"));
    }
    Ok(grid)
}

fn parse_usize_list(section: &str, key: &str, raw: &str) -> Result<Vec<usize>, VolbreakError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| invalid(section, key, &format!("'{s}' is not a positive integer")))
        })
        .collect()
}

fn parse_f64_list(section: &str, key: &str, raw: &str) -> Result<Vec<f64>, VolbreakError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| invalid(section, key, &format!("'{s}' is not a number")))
        })
        .collect()
}

fn invalid(section: &str, key: &str, reason: &str) -> VolbreakError {
    VolbreakError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
