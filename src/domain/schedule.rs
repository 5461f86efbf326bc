//! Rebalance scheduling over the trading calendar.
//!
//! A pure function of the observed trading dates: given the same timeline the
//! same rebalance dates come out every run.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        };
        f.write_str(s)
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(format!("unknown rebalance frequency: {other}")),
        }
    }
}

/// Rebalance dates within `timeline` (assumed ascending).
///
/// Daily: every trading date. Weekly: the first trading date of each ISO
/// week. Monthly: the first trading date of each calendar month.
pub fn rebalance_dates(timeline: &[NaiveDate], freq: Frequency) -> BTreeSet<NaiveDate> {
    match freq {
        Frequency::Daily => timeline.iter().copied().collect(),
        Frequency::Weekly => first_per_key(timeline, |d| {
            let iso = d.iso_week();
            (iso.year(), iso.week())
        }),
        Frequency::Monthly => first_per_key(timeline, |d| (d.year(), d.month())),
    }
}

fn first_per_key<K: Ord>(
    timeline: &[NaiveDate],
    key: impl Fn(&NaiveDate) -> K,
) -> BTreeSet<NaiveDate> {
    let mut seen = BTreeSet::new();
    let mut dates = BTreeSet::new();
    for date in timeline {
        if seen.insert(key(date)) {
            dates.insert(*date);
        }
    }
    dates
}
