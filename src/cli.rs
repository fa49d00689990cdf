//! CLI definition and dispatch.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use crate::adapters::csv_adapter::CsvCandleFeed;
use crate::adapters::csv_report_adapter::{write_sweep_csv, CsvReportWriter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_state_adapter::JsonStateStore;
use crate::domain::candle::Candle;
use crate::domain::config_validation::{
    load_backtest_config, load_param_grid, load_strategy_params,
};
use crate::domain::engine::{self, EngineState};
use crate::domain::error::VolbreakError;
use crate::domain::signal::BreakoutRule;
use crate::domain::sweep::{self, rank_by_return};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::CandleFeed;
use crate::ports::report_port::ReportPort;
use crate::ports::state_port::StateStore;

#[derive(Parser, Debug)]
#[command(name = "volbreak", about = "Volume-filtered breakout backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over a candle file
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sweep the parameter grid and rank the outcomes
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// How many ranked results to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Run the paper loop against a feed, resuming from saved state
    Paper {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Engine state file, created on first run
        #[arg(short, long)]
        state: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the time range and shape of a candle file
    Info {
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            output,
        } => run_backtest(&config, data.as_ref(), output.as_ref()),
        Command::Sweep {
            config,
            data,
            output,
            top,
        } => run_sweep(&config, data.as_ref(), output.as_ref(), top),
        Command::Paper {
            config,
            data,
            state,
        } => run_paper(&config, data.as_ref(), &state),
        Command::Validate { config } => run_validate(&config),
        Command::Info { data } => run_info(&data),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = VolbreakError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Candle file path: the `--data` flag wins, then `[data] candle_file`.
pub fn resolve_data_path(
    flag: Option<&PathBuf>,
    adapter: &dyn ConfigPort,
) -> Result<PathBuf, VolbreakError> {
    if let Some(path) = flag {
        return Ok(path.clone());
    }
    adapter
        .get_string("data", "candle_file")
        .map(PathBuf::from)
        .ok_or_else(|| VolbreakError::ConfigMissing {
            section: "data".to_string(),
            key: "candle_file".to_string(),
        })
}

/// Optional `[backtest] start_date` / `end_date` window (YYYY-MM-DD).
pub fn resolve_time_bounds(
    adapter: &dyn ConfigPort,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), VolbreakError> {
    let parse = |key: &str, end_of_day: bool| -> Result<Option<DateTime<Utc>>, VolbreakError> {
        match adapter.get_string("backtest", key) {
            None => Ok(None),
            Some(raw) => {
                let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                    VolbreakError::ConfigInvalid {
                        section: "backtest".to_string(),
                        key: key.to_string(),
                        reason: "invalid date format (expected YYYY-MM-DD)".to_string(),
                    }
                })?;
                let time = if end_of_day {
                    date.and_hms_opt(23, 59, 59)
                } else {
                    date.and_hms_opt(0, 0, 0)
                };
                Ok(time.map(|t| t.and_utc()))
            }
        }
    };
    Ok((parse("start_date", false)?, parse("end_date", true)?))
}

fn run_backtest(
    config_path: &PathBuf,
    data_flag: Option<&PathBuf>,
    output: Option<&PathBuf>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let (params, bt_config) = match load_run_config(&adapter) {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    // Stage 2: Fetch candles
    let candles = match fetch_candles(data_flag, &adapter) {
        Ok(c) => c,
        Err(code) => return code,
    };
    eprintln!("Loaded {} candles", candles.len());

    // Stage 3: Run
    let rule = BreakoutRule::from_params(&params);
    let result = match engine::run_backtest(&candles, &rule, &params, &bt_config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if !result.state.rejected.is_empty() {
        // [data] strict = true promotes skipped bars to a hard failure.
        if adapter.get_bool("data", "strict", false) {
            let err = VolbreakError::Data {
                reason: format!(
                    "{} malformed candle(s), first at {}",
                    result.state.rejected.len(),
                    result.state.rejected[0].timestamp
                ),
            };
            eprintln!("error: {err}");
            return (&err).into();
        }
        eprintln!(
            "Skipped {} malformed candle(s); first at {}",
            result.state.rejected.len(),
            result.state.rejected[0].timestamp
        );
    }

    // Stage 4: Report
    print_metrics(&result);
    if let Some(dir) = output {
        if let Err(e) = CsvReportWriter.write(&result, &params, dir) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("Report written to {}", dir.display());
    }
    ExitCode::SUCCESS
}

fn run_sweep(
    config_path: &PathBuf,
    data_flag: Option<&PathBuf>,
    output: Option<&PathBuf>,
    top: usize,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let (base, bt_config) = match load_run_config(&adapter) {
        Ok(pair) => pair,
        Err(code) => return code,
    };
    let grid = match load_param_grid(&adapter) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let candles = match fetch_candles(data_flag, &adapter) {
        Ok(c) => c,
        Err(code) => return code,
    };

    // Every combination needs at least one full signal window.
    let minimum = grid.lookbacks.iter().copied().min().unwrap_or(base.lookback) + 1;
    if candles.len() < minimum {
        let err = VolbreakError::InsufficientData {
            bars: candles.len(),
            minimum,
        };
        eprintln!("error: {err}");
        return (&err).into();
    }

    eprintln!(
        "Sweeping {} combinations over {} candles...",
        grid.size(),
        candles.len()
    );
    let cancel = AtomicBool::new(false);
    let mut outcomes = match sweep::run_sweep(&candles, &grid, &base, &bt_config, &cancel) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    rank_by_return(&mut outcomes);

    println!(
        "{:<10} {:>8} {:>6} {:>6} {:>10} {:>8} {:>8} {:>7}",
        "lookback", "vol_mult", "stop", "target", "return%", "sharpe", "max_dd%", "trades"
    );
    for outcome in outcomes.iter().take(top) {
        println!(
            "{:<10} {:>8.2} {:>6.3} {:>6.3} {:>10.2} {:>8.3} {:>8.2} {:>7}",
            outcome.params.lookback,
            outcome.params.volume_multiplier,
            outcome.params.stop_loss_pct,
            outcome.params.take_profit_pct,
            outcome.metrics.total_return * 100.0,
            outcome.metrics.sharpe_ratio,
            outcome.metrics.max_drawdown_pct * 100.0,
            outcome.metrics.total_trades,
        );
    }

    if let Some(dir) = output {
        if let Err(e) = write_sweep_csv(&outcomes, dir) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("Sweep results written to {}", dir.display());
    }
    ExitCode::SUCCESS
}

fn run_paper(config_path: &PathBuf, data_flag: Option<&PathBuf>, state_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let (params, bt_config) = match load_run_config(&adapter) {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    let data_path = match resolve_data_path(data_flag, &adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let mut feed = CsvCandleFeed::new(&data_path);
    let store = JsonStateStore::new(state_path);

    let mut state = match store.load() {
        Ok(Some(saved)) => {
            eprintln!(
                "Resuming from {} ({} bars seen, balance {:.2})",
                state_path.display(),
                saved.bars_seen,
                saved.ledger.balance
            );
            saved
        }
        Ok(None) => {
            eprintln!("No saved state, starting fresh");
            EngineState::new(bt_config.initial_balance)
        }
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let rule = BreakoutRule::from_params(&params);
    let resume_point = state.last_timestamp;
    let mut history: Vec<Candle> = Vec::new();
    let mut applied = 0u64;

    loop {
        let candle = match feed.poll_next() {
            Ok(Some(c)) => c,
            Ok(None) => break,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        // Bars at or before the resume point were already traded in an
        // earlier session; they warm the signal window but are not
        // re-applied. The window only accepts bars the engine itself would
        // have accepted: in order and well-formed.
        if resume_point.is_some_and(|mark| candle.timestamp <= mark) {
            let in_order = history
                .last()
                .is_none_or(|prev| prev.timestamp < candle.timestamp);
            if in_order && candle.validate().is_ok() {
                history.push(candle);
            } else {
                eprintln!("Dropping unusable warm-up bar at {}", candle.timestamp);
            }
            continue;
        }

        let trades_before = state.ledger.trades.len();
        history.push(candle);
        let accepted = engine::apply_candle(&mut state, &history, &rule, &params, &bt_config);
        if !accepted {
            history.pop();
        }
        // A rejected bar still mutates the diagnostics; save either way.
        if let Err(e) = store.save(&state) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        if !accepted {
            continue;
        }
        for trade in &state.ledger.trades[trades_before..] {
            eprintln!(
                "Closed trade: net {:+.2} at {} (balance {:.2})",
                trade.net_pnl, trade.exit_timestamp, state.ledger.balance
            );
        }
        applied += 1;
    }

    eprintln!(
        "Feed drained; applied {} new bar(s), {} total",
        applied, state.bars_seen
    );
    println!("balance:        {:.2}", state.ledger.balance);
    println!("realized pnl:   {:+.2}", state.ledger.realized_pnl());
    println!("closed trades:  {}", state.ledger.trades.len());
    match &state.open_position {
        Some(pos) => println!(
            "open position:  {:?} from {} at {:.4}",
            pos.side, pos.entry_timestamp, pos.entry_price
        ),
        None => println!("open position:  none"),
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(code) = load_run_config(&adapter) {
        return code;
    }
    if let Err(e) = load_param_grid(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    println!("Configuration OK");
    ExitCode::SUCCESS
}

fn run_info(data_path: &PathBuf) -> ExitCode {
    let feed = CsvCandleFeed::new(data_path);
    let candles = match feed.fetch_candles(None, None) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let malformed = candles.iter().filter(|c| c.validate().is_err()).count();
    let (mut low, mut high) = (f64::INFINITY, f64::NEG_INFINITY);
    for candle in &candles {
        low = low.min(candle.low);
        high = high.max(candle.high);
    }

    println!("candles:      {}", candles.len());
    println!("first:        {}", candles[0].timestamp);
    println!("last:         {}", candles[candles.len() - 1].timestamp);
    println!("price range:  {low:.4} - {high:.4}");
    println!("malformed:    {malformed}");
    ExitCode::SUCCESS
}

/// Load strategy params and run config together; both fail the run the
/// same way, so callers get one result.
fn load_run_config(
    adapter: &dyn ConfigPort,
) -> Result<
    (
        crate::domain::params::StrategyParams,
        crate::domain::engine::BacktestConfig,
    ),
    ExitCode,
> {
    let params = load_strategy_params(adapter).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    let bt_config = load_backtest_config(adapter).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    Ok((params, bt_config))
}

fn fetch_candles(
    data_flag: Option<&PathBuf>,
    adapter: &FileConfigAdapter,
) -> Result<Vec<Candle>, ExitCode> {
    let inner = || -> Result<Vec<Candle>, VolbreakError> {
        let data_path = resolve_data_path(data_flag, adapter)?;
        let (start, end) = resolve_time_bounds(adapter)?;
        eprintln!("Loading candles from {}", data_path.display());
        CsvCandleFeed::new(&data_path).fetch_candles(start, end)
    };
    inner().map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn print_metrics(result: &crate::domain::engine::BacktestResult) {
    let m = &result.metrics;
    let ledger = &result.state.ledger;
    println!("final balance:  {:.2}", ledger.balance);
    println!("total return:   {:.2}%", m.total_return * 100.0);
    println!("sharpe ratio:   {:.3}", m.sharpe_ratio);
    println!("max drawdown:   {:.2}%", m.max_drawdown_pct * 100.0);
    println!(
        "trades:         {} ({} won / {} lost)",
        m.total_trades, m.trades_won, m.trades_lost
    );
    println!("win rate:       {:.2}%", m.win_rate * 100.0);
    println!("profit factor:  {:.2}", m.profit_factor);
    println!("expectancy:     {:.2}", m.expectancy);
}
