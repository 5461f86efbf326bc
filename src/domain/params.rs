//! Strategy parameter set and fail-fast validation.

use crate::domain::error::RotraderError;
use crate::domain::schedule::Frequency;

/// Immutable parameter set for one backtest run.
///
/// Validated with [`StrategyParams::validate`] before any simulation starts;
/// out-of-range values never reach the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    /// Trailing-return window, in trading bars.
    pub lookback_period: usize,
    /// Number of top-ranked instruments to hold.
    pub top_n_holdings: usize,
    /// Total target exposure as a fraction of equity.
    pub position_size: f64,
    pub rebalance_freq: Frequency,
    /// Cap on any single position's weight.
    pub max_position_size: f64,
    /// Negative threshold on return from cost basis; 0 disables.
    pub stop_loss_pct: f64,
    /// Positive magnitude of drop from high-water mark; 0 disables.
    pub trailing_stop_pct: f64,
    /// Minimum momentum score an instrument must have to be bought.
    pub min_momentum_threshold: f64,
    /// Proportional cost charged on every trade's notional.
    pub transaction_cost: f64,
    /// Fraction of equity kept uninvested after buys.
    pub min_cash_buffer: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            lookback_period: 20,
            top_n_holdings: 3,
            position_size: 0.95,
            rebalance_freq: Frequency::Weekly,
            max_position_size: 0.4,
            stop_loss_pct: -0.1,
            trailing_stop_pct: 0.05,
            min_momentum_threshold: 0.0,
            transaction_cost: 0.001,
            min_cash_buffer: 0.05,
        }
    }
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), RotraderError> {
        if self.lookback_period == 0 {
            return Err(invalid("lookback_period", "must be positive"));
        }
        if self.top_n_holdings == 0 {
            return Err(invalid("top_n_holdings", "must be positive"));
        }
        if !(self.position_size > 0.0 && self.position_size <= 1.0) {
            return Err(invalid("position_size", "must be in (0, 1]"));
        }
        if !(self.max_position_size > 0.0 && self.max_position_size <= 1.0) {
            return Err(invalid("max_position_size", "must be in (0, 1]"));
        }
        if self.stop_loss_pct > 0.0 {
            return Err(invalid(
                "stop_loss_pct",
                "must be a negative threshold (or 0 to disable)",
            ));
        }
        if self.trailing_stop_pct < 0.0 {
            return Err(invalid(
                "trailing_stop_pct",
                "must be a positive magnitude (or 0 to disable)",
            ));
        }
        if self.transaction_cost < 0.0 {
            return Err(invalid("transaction_cost", "must be non-negative"));
        }
        if !(self.min_cash_buffer >= 0.0 && self.min_cash_buffer < 1.0) {
            return Err(invalid("min_cash_buffer", "must be in [0, 1)"));
        }
        Ok(())
    }
}

fn invalid(name: &str, reason: &str) -> RotraderError {
    RotraderError::InvalidParameter {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(StrategyParams::default().validate().is_ok());
    }

    #[test]
    fn zero_top_n_rejected() {
        let params = StrategyParams {
            top_n_holdings: 0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(RotraderError::InvalidParameter { name, .. }) if name == "top_n_holdings"
        ));
    }

    #[test]
    fn position_size_above_one_rejected() {
        let params = StrategyParams {
            position_size: 1.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn max_position_size_above_one_rejected() {
        let params = StrategyParams {
            max_position_size: 1.1,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn positive_stop_loss_rejected() {
        let params = StrategyParams {
            stop_loss_pct: 0.1,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn negative_trailing_stop_rejected() {
        let params = StrategyParams {
            trailing_stop_pct: -0.05,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn disabled_stops_are_valid() {
        let params = StrategyParams {
            stop_loss_pct: 0.0,
            trailing_stop_pct: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn cash_buffer_of_one_rejected() {
        let params = StrategyParams {
            min_cash_buffer: 1.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
