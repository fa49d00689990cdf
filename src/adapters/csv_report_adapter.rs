//! Backtest report writer.
//!
//! Emits three files into the output directory: `trades.csv` (one row per
//! closed trade), `equity.csv` (sampled equity curve), and `summary.txt`
//! (strategy parameters and metrics in a readable block).

use std::fs;
use std::path::Path;

use crate::domain::engine::BacktestResult;
use crate::domain::error::VolbreakError;
use crate::domain::params::StrategyParams;
use crate::domain::position::{ExitReason, Side};
use crate::domain::sweep::SweepOutcome;
use crate::ports::report_port::ReportPort;

pub struct CsvReportWriter;

impl ReportPort for CsvReportWriter {
    fn write(
        &self,
        result: &BacktestResult,
        params: &StrategyParams,
        output_dir: &Path,
    ) -> Result<(), VolbreakError> {
        fs::create_dir_all(output_dir)?;
        write_trades(result, output_dir)?;
        write_equity(result, output_dir)?;
        write_summary(result, params, output_dir)?;
        Ok(())
    }
}

fn side_label(side: Side) -> &'static str {
    match side {
        Side::Long => "long",
        Side::Short => "short",
    }
}

fn exit_label(reason: ExitReason) -> &'static str {
    match reason {
        ExitReason::StopLoss => "stop_loss",
        ExitReason::TakeProfit => "take_profit",
        ExitReason::ForcedClose => "forced_close",
    }
}

fn write_trades(result: &BacktestResult, output_dir: &Path) -> Result<(), VolbreakError> {
    let path = output_dir.join("trades.csv");
    let mut writer = csv::Writer::from_path(&path).map_err(|e| VolbreakError::Data {
        reason: format!("failed to create {}: {e}", path.display()),
    })?;

    writer
        .write_record([
            "entry_timestamp",
            "exit_timestamp",
            "side",
            "entry_price",
            "exit_price",
            "gross_pnl",
            "fees",
            "net_pnl",
            "exit_reason",
        ])
        .map_err(csv_error)?;

    for trade in &result.state.ledger.trades {
        writer
            .write_record([
                trade.entry_timestamp.to_rfc3339(),
                trade.exit_timestamp.to_rfc3339(),
                side_label(trade.side).to_string(),
                format!("{:.8}", trade.entry_price),
                format!("{:.8}", trade.exit_price),
                format!("{:.8}", trade.gross_pnl),
                format!("{:.8}", trade.fees),
                format!("{:.8}", trade.net_pnl),
                exit_label(trade.exit_reason).to_string(),
            ])
            .map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_equity(result: &BacktestResult, output_dir: &Path) -> Result<(), VolbreakError> {
    let path = output_dir.join("equity.csv");
    let mut writer = csv::Writer::from_path(&path).map_err(|e| VolbreakError::Data {
        reason: format!("failed to create {}: {e}", path.display()),
    })?;

    writer
        .write_record(["timestamp", "equity"])
        .map_err(csv_error)?;
    for point in &result.state.ledger.equity_curve {
        writer
            .write_record([point.timestamp.to_rfc3339(), format!("{:.8}", point.equity)])
            .map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_summary(
    result: &BacktestResult,
    params: &StrategyParams,
    output_dir: &Path,
) -> Result<(), VolbreakError> {
    let m = &result.metrics;
    let ledger = &result.state.ledger;
    let summary = format!(
        "Strategy parameters\n\
         -------------------\n\
         lookback:          {}\n\
         volume multiplier: {:.2}\n\
         stop loss:         {:.2}%\n\
         take profit:       {:.2}%\n\
         position size:     {:.2}%\n\
         leverage:          {:.1}x\n\
         fee rate:          {:.4}%\n\
         \n\
         Results\n\
         -------\n\
         initial balance:   {:.2}\n\
         final balance:     {:.2}\n\
         total return:      {:.2}%\n\
         sharpe ratio:      {:.3}\n\
         max drawdown:      {:.2}%\n\
         trades:            {} ({} won / {} lost)\n\
         win rate:          {:.2}%\n\
         profit factor:     {:.2}\n\
         avg win:           {:.2}\n\
         avg loss:          {:.2}\n\
         largest win:       {:.2}\n\
         largest loss:      {:.2}\n\
         expectancy:        {:.2}\n\
         rejected candles:  {}\n",
        params.lookback,
        params.volume_multiplier,
        params.stop_loss_pct * 100.0,
        params.take_profit_pct * 100.0,
        params.position_size * 100.0,
        params.leverage,
        params.fee_rate * 100.0,
        ledger.initial_balance,
        ledger.balance,
        m.total_return * 100.0,
        m.sharpe_ratio,
        m.max_drawdown_pct * 100.0,
        m.total_trades,
        m.trades_won,
        m.trades_lost,
        m.win_rate * 100.0,
        m.profit_factor,
        m.avg_win,
        m.avg_loss,
        m.largest_win,
        m.largest_loss,
        m.expectancy,
        result.state.rejected.len(),
    );
    fs::write(output_dir.join("summary.txt"), summary)?;
    Ok(())
}

/// Write ranked sweep outcomes to `sweep.csv` in the output directory.
pub fn write_sweep_csv(outcomes: &[SweepOutcome], output_dir: &Path) -> Result<(), VolbreakError> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join("sweep.csv");
    let mut writer = csv::Writer::from_path(&path).map_err(|e| VolbreakError::Data {
        reason: format!("failed to create {}: {e}", path.display()),
    })?;

    writer
        .write_record([
            "lookback",
            "volume_multiplier",
            "stop_loss_pct",
            "take_profit_pct",
            "total_return",
            "sharpe_ratio",
            "max_drawdown_pct",
            "total_trades",
            "win_rate",
            "profit_factor",
            "rejected_candles",
        ])
        .map_err(csv_error)?;

    for outcome in outcomes {
        writer
            .write_record([
                outcome.params.lookback.to_string(),
                format!("{:.4}", outcome.params.volume_multiplier),
                format!("{:.4}", outcome.params.stop_loss_pct),
                format!("{:.4}", outcome.params.take_profit_pct),
                format!("{:.6}", outcome.metrics.total_return),
                format!("{:.6}", outcome.metrics.sharpe_ratio),
                format!("{:.6}", outcome.metrics.max_drawdown_pct),
                outcome.metrics.total_trades.to_string(),
                format!("{:.4}", outcome.metrics.win_rate),
                format!("{:.4}", outcome.metrics.profit_factor),
                outcome.rejected_candles.to_string(),
            ])
            .map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_error(e: csv::Error) -> VolbreakError {
    VolbreakError::Data {
        reason: format!("CSV write error: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::engine::{run_backtest, BacktestConfig};
    use crate::domain::signal::BreakoutRule;
    use chrono::{DateTime, Utc};

    fn ts(hours: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(hours * 3600, 0).unwrap()
    }

    fn breakout_series() -> Vec<crate::domain::candle::Candle> {
        let mut candles: Vec<_> = (0..10)
            .map(|i| crate::domain::candle::Candle {
                timestamp: ts(i * 4),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 10.0,
            })
            .collect();
        candles.push(crate::domain::candle::Candle {
            timestamp: ts(40),
            open: 100.0,
            high: 106.0,
            low: 100.0,
            close: 105.0,
            volume: 50.0,
        });
        candles.push(crate::domain::candle::Candle {
            timestamp: ts(44),
            open: 105.0,
            high: 112.0,
            low: 104.0,
            close: 111.0,
            volume: 30.0,
        });
        candles
    }

    fn sample_result() -> (BacktestResult, StrategyParams) {
        let params = StrategyParams {
            lookback: 10,
            ..StrategyParams::default()
        };
        let rule = BreakoutRule::from_params(&params);
        let result =
            run_backtest(&breakout_series(), &rule, &params, &BacktestConfig::default()).unwrap();
        (result, params)
    }

    #[test]
    fn writes_all_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let (result, params) = sample_result();

        CsvReportWriter.write(&result, &params, dir.path()).unwrap();

        assert!(dir.path().join("trades.csv").exists());
        assert!(dir.path().join("equity.csv").exists());
        assert!(dir.path().join("summary.txt").exists());
    }

    #[test]
    fn trades_csv_has_one_row_per_trade() {
        let dir = tempfile::tempdir().unwrap();
        let (result, params) = sample_result();
        CsvReportWriter.write(&result, &params, dir.path()).unwrap();

        let content = fs::read_to_string(dir.path().join("trades.csv")).unwrap();
        let rows = content.lines().count();
        assert_eq!(rows, result.state.ledger.trades.len() + 1);
    }

    #[test]
    fn summary_mentions_final_balance() {
        let dir = tempfile::tempdir().unwrap();
        let (result, params) = sample_result();
        CsvReportWriter.write(&result, &params, dir.path()).unwrap();

        let content = fs::read_to_string(dir.path().join("summary.txt")).unwrap();
        assert!(content.contains("final balance"));
        assert!(content.contains(&format!("{:.2}", result.state.ledger.balance)));
    }

    #[test]
    fn sweep_csv_is_one_row_per_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let (result, params) = sample_result();
        let outcomes = vec![SweepOutcome {
            params,
            metrics: result.metrics,
            rejected_candles: 0,
        }];

        write_sweep_csv(&outcomes, dir.path()).unwrap();
        let content = fs::read_to_string(dir.path().join("sweep.csv")).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn creates_missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("reports").join("run1");
        let (result, params) = sample_result();

        CsvReportWriter.write(&result, &params, &nested).unwrap();
        assert!(nested.join("summary.txt").exists());
    }
}
