//! Performance statistics over the recorded equity curve.

use chrono::NaiveDate;

use crate::domain::portfolio::LedgerSnapshot;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_return: f64,
    /// Total return compounded over elapsed calendar years.
    pub annualized_return: f64,
    /// Stddev of daily returns scaled by sqrt(252).
    pub annualized_volatility: f64,
    /// Annualized return over annualized volatility; 0 when volatility is 0.
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline, as a positive fraction.
    pub max_drawdown: f64,
    /// Fraction of rebalance-to-rebalance periods with non-negative return.
    pub win_rate: f64,
    pub final_equity: f64,
    pub trading_days: usize,
}

impl Summary {
    /// Pure function of the snapshot sequence and the rebalance calendar.
    pub fn compute(snapshots: &[LedgerSnapshot], rebalance_dates: &[NaiveDate]) -> Self {
        let trading_days = snapshots.len();
        let (Some(first), Some(last)) = (snapshots.first(), snapshots.last()) else {
            return Summary {
                total_return: 0.0,
                annualized_return: 0.0,
                annualized_volatility: 0.0,
                sharpe_ratio: 0.0,
                max_drawdown: 0.0,
                win_rate: 0.0,
                final_equity: 0.0,
                trading_days,
            };
        };

        let total_return = if first.total_equity > 0.0 {
            last.total_equity / first.total_equity - 1.0
        } else {
            0.0
        };

        let years = (last.date - first.date).num_days() as f64 / DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let annualized_volatility = daily_return_stddev(snapshots) * TRADING_DAYS_PER_YEAR.sqrt();
        let sharpe_ratio = if annualized_volatility > 0.0 {
            annualized_return / annualized_volatility
        } else {
            0.0
        };

        Summary {
            total_return,
            annualized_return,
            annualized_volatility,
            sharpe_ratio,
            max_drawdown: max_drawdown(snapshots),
            win_rate: win_rate(snapshots, rebalance_dates),
            final_equity: last.total_equity,
            trading_days,
        }
    }
}

fn daily_return_stddev(snapshots: &[LedgerSnapshot]) -> f64 {
    if snapshots.len() < 2 {
        return 0.0;
    }
    let returns: Vec<f64> = snapshots
        .windows(2)
        .map(|w| {
            if w[0].total_equity > 0.0 {
                w[1].total_equity / w[0].total_equity - 1.0
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

fn max_drawdown(snapshots: &[LedgerSnapshot]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    for snap in snapshots {
        if snap.total_equity > peak {
            peak = snap.total_equity;
        } else if peak > 0.0 {
            let dd = (peak - snap.total_equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Equity is sampled at each rebalance date (plus the final snapshot when it
/// extends past the last rebalance); a period wins when its return is
/// non-negative.
fn win_rate(snapshots: &[LedgerSnapshot], rebalance_dates: &[NaiveDate]) -> f64 {
    let mut marks: Vec<f64> = Vec::new();
    let mut last_mark_date = None;
    for snap in snapshots {
        if rebalance_dates.binary_search(&snap.date).is_ok() {
            marks.push(snap.total_equity);
            last_mark_date = Some(snap.date);
        }
    }
    if let (Some(last_snap), Some(mark_date)) = (snapshots.last(), last_mark_date) {
        if last_snap.date > mark_date {
            marks.push(last_snap.total_equity);
        }
    }

    if marks.len() < 2 {
        return 0.0;
    }
    let periods = marks.len() - 1;
    let wins = marks
        .windows(2)
        .filter(|w| w[0] <= 0.0 || w[1] >= w[0])
        .count();
    wins as f64 / periods as f64
}
