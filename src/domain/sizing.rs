//! Target-weight construction from a momentum ranking.

use crate::domain::momentum::MomentumScore;
use crate::domain::params::StrategyParams;

/// A target allocation for one instrument, produced fresh each rebalance.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetWeight {
    pub symbol: String,
    pub weight: f64,
}

/// Sizing seam, mirroring [`crate::domain::momentum::Ranker`].
pub trait Sizer {
    fn size(&self, ranking: &[MomentumScore]) -> Vec<TargetWeight>;
}

/// Equal weight across the selected top N, capped per position.
///
/// When the equal split exceeds `max_position_size` the excess is NOT
/// redistributed across the remaining names; the strategy deliberately
/// under-deploys and the remainder stays in cash.
#[derive(Debug, Clone)]
pub struct EqualWeightSizer {
    pub top_n_holdings: usize,
    pub min_momentum_threshold: f64,
    pub position_size: f64,
    pub max_position_size: f64,
}

impl EqualWeightSizer {
    pub fn from_params(params: &StrategyParams) -> Self {
        EqualWeightSizer {
            top_n_holdings: params.top_n_holdings,
            min_momentum_threshold: params.min_momentum_threshold,
            position_size: params.position_size,
            max_position_size: params.max_position_size,
        }
    }
}

impl Sizer for EqualWeightSizer {
    fn size(&self, ranking: &[MomentumScore]) -> Vec<TargetWeight> {
        let selected: Vec<&MomentumScore> = ranking
            .iter()
            .filter(|s| s.score >= self.min_momentum_threshold)
            .take(self.top_n_holdings)
            .collect();

        if selected.is_empty() {
            return Vec::new();
        }

        let weight =
            (self.position_size / selected.len() as f64).min(self.max_position_size);

        selected
            .into_iter()
            .map(|s| TargetWeight {
                symbol: s.symbol.clone(),
                weight,
            })
            .collect()
    }
}
