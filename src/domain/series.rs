//! Per-instrument price series and the unified trading timeline.

use crate::domain::bar::PriceBar;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// Ordered daily bars for one instrument with O(1) date lookup.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
    date_index: HashMap<NaiveDate, usize>,
}

impl PriceSeries {
    /// Bars must already be in ascending date order, unique per date
    /// (the data port contract).
    pub fn new(symbol: String, bars: Vec<PriceBar>) -> Self {
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Self {
            symbol,
            bars,
            date_index,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn bar_on(&self, date: NaiveDate) -> Option<&PriceBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    /// Close `lookback` trading bars before `as_of`, if the series reaches
    /// back that far. Returns `None` when `as_of` itself has no bar.
    pub fn close_lookback(&self, as_of: NaiveDate, lookback: usize) -> Option<f64> {
        let idx = self.index_of(as_of)?;
        if idx < lookback {
            return None;
        }
        Some(self.bars[idx - lookback].close)
    }
}

/// All trading dates observed across the universe, ascending.
pub fn build_timeline(series: &[PriceSeries]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = series
        .iter()
        .flat_map(|s| s.bars.iter().map(|bar| bar.date))
        .collect();
    unique_dates.into_iter().collect()
}
