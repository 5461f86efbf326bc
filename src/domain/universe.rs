//! Instrument universe: parsing and data validation.
//!
//! Parses symbol lists from configuration and checks that each instrument
//! has enough history to be worth simulating.

use crate::domain::bar::Adjustment;
use crate::domain::error::RotraderError;
use crate::domain::series::PriceSeries;
use crate::ports::data_port::PriceSeriesStore;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Immutable reference data for one tradable instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Instrument {
            name: symbol.clone(),
            symbol,
        }
    }

    pub fn with_name(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Instrument {
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

/// Parse a comma-separated symbol list; order preserved, duplicates rejected.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize, minimum: usize },
}

#[derive(Debug)]
pub struct LoadedUniverse {
    /// Reference data for the instruments that validated, series order.
    pub instruments: Vec<Instrument>,
    pub series: Vec<PriceSeries>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Fetch each instrument's series and drop the ones that cannot support a
/// single momentum score. Upstream store failures propagate; an empty or
/// short series is skipped with a warning instead.
pub fn load_universe(
    store: &dyn PriceSeriesStore,
    candidates: &[Instrument],
    adjustment: Adjustment,
    start_date: NaiveDate,
    end_date: NaiveDate,
    lookback_period: usize,
) -> Result<LoadedUniverse, RotraderError> {
    let minimum = lookback_period + 1;
    let mut instruments = Vec::new();
    let mut series = Vec::new();
    let mut skipped = Vec::new();

    for instrument in candidates {
        let symbol = &instrument.symbol;
        let bars = store.get_series(symbol, adjustment, start_date, end_date)?;

        if bars.is_empty() {
            eprintln!("warning: skipping {symbol} (no data in range)");
            skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        }

        if bars.len() < minimum {
            eprintln!(
                "warning: skipping {symbol} (only {} bars, {minimum} required)",
                bars.len()
            );
            skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::InsufficientBars {
                    bars: bars.len(),
                    minimum,
                },
            });
            continue;
        }

        eprintln!("  {symbol}: {} bars [OK]", bars.len());
        instruments.push(instrument.clone());
        series.push(PriceSeries::new(symbol.clone(), bars));
    }

    if series.is_empty() {
        return Err(RotraderError::NoData {
            symbol: "all".to_string(),
        });
    }

    if !skipped.is_empty() {
        eprintln!(
            "simulating {} of {} instruments",
            series.len(),
            series.len() + skipped.len()
        );
    }

    Ok(LoadedUniverse {
        instruments,
        series,
        skipped,
    })
}
