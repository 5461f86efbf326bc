//! Price-series access port.

use crate::domain::bar::{Adjustment, PriceBar};
use crate::domain::error::RotraderError;
use chrono::NaiveDate;

/// Upstream price store contract.
///
/// Implementations must return bars in strictly ascending date order, unique
/// per date, or fail with `DataGap` / `DataSource`. The core never
/// forward-fills missing dates.
pub trait PriceSeriesStore {
    fn get_series(
        &self,
        symbol: &str,
        adjustment: Adjustment,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, RotraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, RotraderError>;

    /// (first date, last date, bar count) for a symbol, if any data exists.
    fn get_data_range(
        &self,
        symbol: &str,
        adjustment: Adjustment,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RotraderError>;
}
