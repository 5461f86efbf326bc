#![allow(dead_code)]

use chrono::NaiveDate;
use rotrader::domain::bar::{Adjustment, PriceBar};
use rotrader::domain::error::RotraderError;
use rotrader::domain::params::StrategyParams;
use rotrader::domain::schedule::Frequency;
use rotrader::domain::series::PriceSeries;
use rotrader::domain::universe::Instrument;
use rotrader::ports::data_port::PriceSeriesStore;
use std::collections::HashMap;

pub struct MockPriceStore {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockPriceStore {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl PriceSeriesStore for MockPriceStore {
    fn get_series(
        &self,
        symbol: &str,
        _adjustment: Adjustment,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, RotraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(RotraderError::DataSource {
                reason: reason.clone(),
            });
        }
        let mut bars = self.data.get(symbol).cloned().unwrap_or_default();
        bars.retain(|b| b.date >= start_date && b.date <= end_date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, RotraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        _adjustment: Adjustment,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RotraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(RotraderError::DataSource {
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(symbol: &str, bar_date: NaiveDate, close: f64) -> PriceBar {
    PriceBar {
        symbol: symbol.to_string(),
        date: bar_date,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1000,
        amount: close * 1000.0,
    }
}

/// One bar per consecutive calendar day, closes taken verbatim.
pub fn bars_from_closes(symbol: &str, start: NaiveDate, closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(symbol, start + chrono::Duration::days(i as i64), close))
        .collect()
}

pub fn series_from_closes(symbol: &str, start: NaiveDate, closes: &[f64]) -> PriceSeries {
    PriceSeries::new(symbol.to_string(), bars_from_closes(symbol, start, closes))
}

pub fn instruments(symbols: &[&str]) -> Vec<Instrument> {
    symbols.iter().map(|s| Instrument::new(*s)).collect()
}

/// Frictionless daily-rebalance params with stops disabled; tests override
/// the fields they exercise.
pub fn daily_params(lookback: usize, top_n: usize) -> StrategyParams {
    StrategyParams {
        lookback_period: lookback,
        top_n_holdings: top_n,
        position_size: 0.9,
        rebalance_freq: Frequency::Daily,
        max_position_size: 0.9,
        stop_loss_pct: 0.0,
        trailing_stop_pct: 0.0,
        min_momentum_threshold: -1.0,
        transaction_cost: 0.0,
        min_cash_buffer: 0.0,
    }
}
