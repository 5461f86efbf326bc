//! Report generation port.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::RotraderError;
use crate::domain::metrics::Summary;
use crate::domain::params::StrategyParams;

/// Port for writing backtest reports for downstream consumers.
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        summary: &Summary,
        params: &StrategyParams,
        output_path: &str,
    ) -> Result<(), RotraderError>;
}
