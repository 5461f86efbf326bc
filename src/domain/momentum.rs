//! Momentum scoring and ranking.

use crate::domain::error::RotraderError;
use crate::domain::series::PriceSeries;
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Trailing-return score for one instrument at one rebalance date.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentumScore {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub lookback: usize,
    pub score: f64,
}

/// Ranking seam: alternate scoring schemes plug in here without touching the
/// simulation loop.
pub trait Ranker {
    /// Scores for every instrument scorable at `as_of`, descending by score,
    /// ties broken by symbol. Instruments without enough history are
    /// excluded, not scored zero.
    fn rank(&self, universe: &[PriceSeries], as_of: NaiveDate) -> Vec<MomentumScore>;
}

/// Default ranker: close[as_of] / close[as_of - lookback] - 1.
#[derive(Debug, Clone, Copy)]
pub struct TrailingReturnRanker {
    pub lookback: usize,
}

impl Ranker for TrailingReturnRanker {
    fn rank(&self, universe: &[PriceSeries], as_of: NaiveDate) -> Vec<MomentumScore> {
        let mut scores: Vec<MomentumScore> = universe
            .iter()
            .filter_map(|series| {
                let bar = series.bar_on(as_of)?;
                let past = series.close_lookback(as_of, self.lookback)?;
                if past <= 0.0 {
                    return None;
                }
                let score = bar.close / past - 1.0;
                if !score.is_finite() {
                    return None;
                }
                Some(MomentumScore {
                    symbol: series.symbol.clone(),
                    as_of,
                    lookback: self.lookback,
                    score,
                })
            })
            .collect();

        scores.sort_by(|a, b| match b.score.partial_cmp(&a.score) {
            Some(Ordering::Equal) | None => a.symbol.cmp(&b.symbol),
            Some(ord) => ord,
        });
        scores
    }
}

/// Rank the universe, failing with `InsufficientHistory` when fewer
/// instruments are scorable than the selection step requested.
pub fn rank_universe(
    ranker: &dyn Ranker,
    universe: &[PriceSeries],
    as_of: NaiveDate,
    requested: usize,
) -> Result<Vec<MomentumScore>, RotraderError> {
    let scores = ranker.rank(universe, as_of);
    if scores.len() < requested {
        return Err(RotraderError::InsufficientHistory {
            have: scores.len(),
            need: requested,
        });
    }
    Ok(scores)
}
