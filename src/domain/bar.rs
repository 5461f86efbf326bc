//! Daily price bar and price-adjustment variant.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Corporate-action adjustment convention of a price series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Adjustment {
    Unadjusted,
    Forward,
    Backward,
}

impl Adjustment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Adjustment::Unadjusted => "unadjusted",
            Adjustment::Forward => "forward",
            Adjustment::Backward => "backward",
        }
    }
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Adjustment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unadjusted" | "none" => Ok(Adjustment::Unadjusted),
            "forward" => Ok(Adjustment::Forward),
            "backward" => Ok(Adjustment::Backward),
            other => Err(format!("unknown adjustment variant: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PriceBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    /// Traded value for the day (price x volume as reported upstream).
    pub amount: f64,
}
