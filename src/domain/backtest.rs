//! The backtest engine: an explicit, owned simulation loop.
//!
//! Each trading date is processed strictly in order: mark to market, stop
//! checks (exits fill first), then the scheduled rebalance against the
//! post-exit ledger state.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

use crate::domain::error::RotraderError;
use crate::domain::execution::{execute_exits, rebalance_to_targets};
use crate::domain::momentum::{rank_universe, MomentumScore, Ranker, TrailingReturnRanker};
use crate::domain::params::StrategyParams;
use crate::domain::portfolio::PortfolioLedger;
use crate::domain::schedule::rebalance_dates;
use crate::domain::series::PriceSeries;
use crate::domain::sizing::{EqualWeightSizer, Sizer, TargetWeight};

/// One executed rebalance, kept for reporting.
#[derive(Debug, Clone)]
pub struct RebalanceEvent {
    pub date: NaiveDate,
    pub scores: Vec<MomentumScore>,
    pub targets: Vec<TargetWeight>,
}

/// A scheduled rebalance that was skipped for lack of scorable instruments.
#[derive(Debug, Clone)]
pub struct SkippedRebalance {
    pub date: NaiveDate,
    pub have: usize,
    pub need: usize,
}

#[derive(Debug)]
pub struct BacktestResult {
    pub ledger: PortfolioLedger,
    /// Scheduled rebalance dates within the timeline, executed or not.
    pub rebalance_dates: Vec<NaiveDate>,
    pub rebalances: Vec<RebalanceEvent>,
    pub skipped: Vec<SkippedRebalance>,
}

/// Run one backtest with the default trailing-return ranker and
/// equal-weight sizer.
pub fn run_backtest(
    universe: &[PriceSeries],
    timeline: &[NaiveDate],
    params: &StrategyParams,
    initial_capital: f64,
) -> Result<BacktestResult, RotraderError> {
    let ranker = TrailingReturnRanker {
        lookback: params.lookback_period,
    };
    let sizer = EqualWeightSizer::from_params(params);
    run_backtest_with(universe, timeline, params, initial_capital, &ranker, &sizer)
}

/// Run one backtest with pluggable ranking and sizing.
pub fn run_backtest_with(
    universe: &[PriceSeries],
    timeline: &[NaiveDate],
    params: &StrategyParams,
    initial_capital: f64,
    ranker: &dyn Ranker,
    sizer: &dyn Sizer,
) -> Result<BacktestResult, RotraderError> {
    params.validate()?;
    if initial_capital <= 0.0 {
        return Err(RotraderError::InvalidParameter {
            name: "initial_capital".into(),
            reason: "must be positive".into(),
        });
    }

    let scheduled = rebalance_dates(timeline, params.rebalance_freq);
    let mut ledger = PortfolioLedger::new(initial_capital);
    let mut rebalances = Vec::new();
    let mut skipped = Vec::new();

    for &date in timeline {
        let prices = closes_on(universe, date);

        ledger.mark_to_market(date, &prices);

        let exits = crate::domain::risk::check_stops(&ledger, &prices, params);
        let exited: HashSet<String> = exits.iter().map(|o| o.symbol.clone()).collect();
        if let Err(err) = execute_exits(&mut ledger, &exits, &prices, date, params) {
            dump_ledger(&ledger, date);
            return Err(err);
        }

        if !scheduled.contains(&date) {
            continue;
        }

        let scores = match rank_universe(ranker, universe, date, params.top_n_holdings) {
            Ok(scores) => scores,
            Err(RotraderError::InsufficientHistory { have, need }) => {
                eprintln!(
                    "warning: skipping rebalance on {date}: {have} scorable instruments, {need} requested"
                );
                skipped.push(SkippedRebalance { date, have, need });
                continue;
            }
            Err(err) => return Err(err),
        };

        // Instruments stopped out today sit out this rebalance; the next
        // slot in the ranking takes their place.
        let eligible: Vec<MomentumScore> = scores
            .iter()
            .filter(|s| !exited.contains(&s.symbol))
            .cloned()
            .collect();

        let targets = sizer.size(&eligible);
        debug_assert!(
            targets.iter().map(|t| t.weight).sum::<f64>() <= params.position_size + 1e-9
        );
        debug_assert!(
            targets
                .iter()
                .all(|t| t.weight <= params.max_position_size + 1e-9)
        );

        if let Err(err) = rebalance_to_targets(&mut ledger, &targets, &prices, date, params) {
            dump_ledger(&ledger, date);
            return Err(err);
        }

        rebalances.push(RebalanceEvent {
            date,
            scores,
            targets,
        });
    }

    Ok(BacktestResult {
        ledger,
        rebalance_dates: scheduled.into_iter().collect(),
        rebalances,
        skipped,
    })
}

fn closes_on(universe: &[PriceSeries], date: NaiveDate) -> HashMap<String, f64> {
    universe
        .iter()
        .filter_map(|series| {
            series
                .bar_on(date)
                .map(|bar| (series.symbol.clone(), bar.close))
        })
        .collect()
}

/// Invariant breaches abort the run; leave the full ledger on stderr for
/// diagnosis.
fn dump_ledger(ledger: &PortfolioLedger, date: NaiveDate) {
    eprintln!("fatal: aborting run on {date}; ledger state follows");
    eprintln!("{ledger:#?}");
}
