//! Order execution simulation: forced exits, rebalance deltas, transaction
//! costs, and the cash-buffer constraint.
//!
//! Within one date the order of operations is exits, then sells toward lower
//! target weights, then buys, so that sale proceeds are available before the
//! buffer check constrains the buys.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::error::RotraderError;
use crate::domain::order::{Order, OrderReason, Side};
use crate::domain::params::StrategyParams;
use crate::domain::portfolio::PortfolioLedger;
use crate::domain::sizing::TargetWeight;

/// Rebalance deltas smaller than this fraction of equity are not traded.
const MIN_TRADE_WEIGHT: f64 = 0.01;

/// Proportional cost charged on a trade's notional, buys and sells alike.
pub fn trade_cost(notional: f64, rate: f64) -> f64 {
    notional * rate
}

/// Execute forced exits in full. Sells always execute regardless of the
/// cash buffer since they free cash.
pub fn execute_exits(
    ledger: &mut PortfolioLedger,
    exits: &[Order],
    prices: &HashMap<String, f64>,
    date: NaiveDate,
    params: &StrategyParams,
) -> Result<(), RotraderError> {
    for order in exits {
        let Some(&price) = prices.get(&order.symbol) else {
            continue;
        };
        let cost = trade_cost(order.quantity as f64 * price, params.transaction_cost);
        ledger.apply_fill(order, price, cost, date)?;
    }
    Ok(())
}

/// Trade the ledger toward the target weights at current bar closes.
///
/// Holdings absent from the targets are liquidated in full. In-target
/// deltas below [`MIN_TRADE_WEIGHT`] of equity are left alone. The
/// aggregate buy notional is scaled down uniformly when executing it in
/// full would leave cash under `min_cash_buffer` x total equity.
pub fn rebalance_to_targets(
    ledger: &mut PortfolioLedger,
    targets: &[TargetWeight],
    prices: &HashMap<String, f64>,
    date: NaiveDate,
    params: &StrategyParams,
) -> Result<(), RotraderError> {
    let equity = ledger.total_equity();
    if equity <= 0.0 {
        return Err(RotraderError::CashConstraintViolation {
            date,
            cash: ledger.cash,
        });
    }

    let target_weights: HashMap<&str, f64> = targets
        .iter()
        .map(|t| (t.symbol.as_str(), t.weight))
        .collect();

    // Sell phase: liquidations first, then reductions toward lower targets.
    let mut held: Vec<(String, i64)> = ledger
        .positions
        .values()
        .map(|p| (p.symbol.clone(), p.quantity))
        .collect();
    held.sort();

    for (symbol, quantity) in held {
        let Some(&price) = prices.get(&symbol) else {
            // No bar today: cannot trade this instrument.
            continue;
        };
        let current_value = quantity as f64 * price;
        let sell_quantity = match target_weights.get(symbol.as_str()) {
            None => quantity,
            Some(&weight) => {
                let delta = weight * equity - current_value;
                if delta >= 0.0 || -delta / equity < MIN_TRADE_WEIGHT {
                    continue;
                }
                ((-delta / price).floor() as i64).min(quantity)
            }
        };
        if sell_quantity == 0 {
            continue;
        }
        let order = Order {
            symbol,
            side: Side::Sell,
            quantity: sell_quantity,
            reason: OrderReason::Rebalance,
        };
        let cost = trade_cost(sell_quantity as f64 * price, params.transaction_cost);
        ledger.apply_fill(&order, price, cost, date)?;
    }

    // Buy phase: compute desired notionals, then scale for the cash buffer.
    let mut buys: Vec<(String, f64, f64)> = Vec::new();
    for target in targets {
        let Some(&price) = prices.get(target.symbol.as_str()) else {
            continue;
        };
        let current_value = ledger
            .position(&target.symbol)
            .map(|p| p.quantity as f64 * price)
            .unwrap_or(0.0);
        let delta = target.weight * equity - current_value;
        if delta <= 0.0 || delta / equity < MIN_TRADE_WEIGHT {
            continue;
        }
        buys.push((target.symbol.clone(), price, delta));
    }

    if buys.is_empty() {
        return Ok(());
    }

    let gross: f64 = buys
        .iter()
        .map(|(_, _, notional)| notional * (1.0 + params.transaction_cost))
        .sum();
    let available = ledger.cash - params.min_cash_buffer * ledger.total_equity();
    let scale = if gross > available {
        (available / gross).max(0.0)
    } else {
        1.0
    };

    for (symbol, price, notional) in buys {
        let mut quantity = (notional * scale / price).floor() as i64;
        // Whole-share rounding can still overshoot remaining cash.
        let unit_cost = price * (1.0 + params.transaction_cost);
        let affordable = (ledger.cash / unit_cost).floor() as i64;
        quantity = quantity.min(affordable);
        if quantity <= 0 {
            continue;
        }
        let order = Order {
            symbol,
            side: Side::Buy,
            quantity,
            reason: OrderReason::Rebalance,
        };
        let cost = trade_cost(quantity as f64 * price, params.transaction_cost);
        ledger.apply_fill(&order, price, cost, date)?;
    }

    Ok(())
}
