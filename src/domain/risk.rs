//! Stop-loss and trailing-stop monitoring between rebalances.

use std::collections::HashMap;

use crate::domain::order::{Order, OrderReason, Side};
use crate::domain::params::StrategyParams;
use crate::domain::portfolio::PortfolioLedger;

/// Check every open position against the stop rules and emit full-exit
/// orders for breaches. Runs on every trading date, before any rebalance
/// logic; high-water marks must already include today's close.
///
/// Both rules use the position's own references (cost basis, high-water
/// mark), never portfolio-level figures. A threshold of 0 disables the rule.
pub fn check_stops(
    ledger: &PortfolioLedger,
    prices: &HashMap<String, f64>,
    params: &StrategyParams,
) -> Vec<Order> {
    let mut exits: Vec<Order> = ledger
        .positions
        .values()
        .filter_map(|position| {
            let &price = prices.get(&position.symbol)?;

            let reason = if params.stop_loss_pct < 0.0
                && position.return_from_cost(price) <= params.stop_loss_pct
            {
                OrderReason::StopLoss
            } else if params.trailing_stop_pct > 0.0
                && position.return_from_high_water(price) <= -params.trailing_stop_pct
            {
                OrderReason::TrailingStop
            } else {
                return None;
            };

            Some(Order {
                symbol: position.symbol.clone(),
                side: Side::Sell,
                quantity: position.quantity,
                reason,
            })
        })
        .collect();

    // HashMap iteration order is arbitrary; exits must not be.
    exits.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    exits
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn ledger_with(symbol: &str, quantity: i64, price: f64) -> PortfolioLedger {
        let mut ledger = PortfolioLedger::new(1_000_000.0);
        ledger
            .apply_fill(
                &Order {
                    symbol: symbol.into(),
                    side: Side::Buy,
                    quantity,
                    reason: OrderReason::Rebalance,
                },
                price,
                0.0,
                date(2),
            )
            .unwrap();
        ledger
    }

    fn prices(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(s, p)| (s.to_string(), *p)).collect()
    }

    fn params() -> StrategyParams {
        StrategyParams {
            stop_loss_pct: -0.1,
            trailing_stop_pct: 0.05,
            ..Default::default()
        }
    }

    #[test]
    fn stop_loss_triggers_below_threshold() {
        let ledger = ledger_with("510300", 100, 100.0);
        let exits = check_stops(&ledger, &prices(&[("510300", 89.0)]), &params());

        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].reason, OrderReason::StopLoss);
        assert_eq!(exits[0].quantity, 100);
        assert_eq!(exits[0].side, Side::Sell);
    }

    #[test]
    fn stop_loss_exact_threshold_triggers() {
        // 87.5/100 - 1 = -0.125, exactly representable.
        let ledger = ledger_with("510300", 100, 100.0);
        let exact = StrategyParams {
            stop_loss_pct: -0.125,
            ..params()
        };
        let exits = check_stops(&ledger, &prices(&[("510300", 87.5)]), &exact);
        assert_eq!(exits.len(), 1);
    }

    #[test]
    fn no_exit_above_threshold() {
        let ledger = ledger_with("510300", 100, 100.0);
        let exits = check_stops(&ledger, &prices(&[("510300", 95.0)]), &params());
        assert!(exits.is_empty());
    }

    #[test]
    fn trailing_stop_uses_high_water_mark() {
        let mut ledger = ledger_with("510300", 100, 100.0);
        ledger
            .positions
            .get_mut("510300")
            .unwrap()
            .mark(120.0);

        // 113/120 - 1 = -0.0583 <= -0.05: exit.
        let exits = check_stops(&ledger, &prices(&[("510300", 113.0)]), &params());
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].reason, OrderReason::TrailingStop);

        // 115/120 - 1 = -0.0417: hold.
        let exits = check_stops(&ledger, &prices(&[("510300", 115.0)]), &params());
        assert!(exits.is_empty());
    }

    #[test]
    fn stop_loss_takes_priority_over_trailing() {
        let mut ledger = ledger_with("510300", 100, 100.0);
        ledger
            .positions
            .get_mut("510300")
            .unwrap()
            .mark(120.0);

        // 85 breaches both rules; reported as stop_loss.
        let exits = check_stops(&ledger, &prices(&[("510300", 85.0)]), &params());
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].reason, OrderReason::StopLoss);
    }

    #[test]
    fn zero_thresholds_disable_rules() {
        let ledger = ledger_with("510300", 100, 100.0);
        let disabled = StrategyParams {
            stop_loss_pct: 0.0,
            trailing_stop_pct: 0.0,
            ..Default::default()
        };
        let exits = check_stops(&ledger, &prices(&[("510300", 1.0)]), &disabled);
        assert!(exits.is_empty());
    }

    #[test]
    fn position_without_todays_bar_is_skipped() {
        let ledger = ledger_with("510300", 100, 100.0);
        let exits = check_stops(&ledger, &prices(&[]), &params());
        assert!(exits.is_empty());
    }

    #[test]
    fn exits_sorted_by_symbol() {
        let mut ledger = ledger_with("518880", 100, 100.0);
        ledger
            .apply_fill(
                &Order {
                    symbol: "510300".into(),
                    side: Side::Buy,
                    quantity: 100,
                    reason: OrderReason::Rebalance,
                },
                100.0,
                0.0,
                date(2),
            )
            .unwrap();

        let exits = check_stops(
            &ledger,
            &prices(&[("510300", 80.0), ("518880", 80.0)]),
            &params(),
        );
        assert_eq!(exits.len(), 2);
        assert_eq!(exits[0].symbol, "510300");
        assert_eq!(exits[1].symbol, "518880");
    }
}
