//! Report generation port trait.

use crate::domain::engine::BacktestResult;
use crate::domain::error::VolbreakError;
use crate::domain::params::StrategyParams;
use std::path::Path;

/// Port for writing backtest results.
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        params: &StrategyParams,
        output_dir: &Path,
    ) -> Result<(), VolbreakError>;
}
