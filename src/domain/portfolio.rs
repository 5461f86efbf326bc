//! Portfolio ledger: the authoritative cash / holdings / P&L state.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::error::RotraderError;
use crate::domain::order::{Order, OrderReason, Side};
use crate::domain::position::Position;

/// Cash headroom tolerance when settling buys.
const CASH_EPSILON: f64 = 1e-6;

/// One point of the equity curve; append-only, one per processed date.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    pub date: NaiveDate,
    pub cash: f64,
    pub holdings_value: f64,
    pub total_equity: f64,
}

/// One executed fill, with the reason it was ordered.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub side: Side,
    pub quantity: i64,
    pub price: f64,
    /// Transaction cost charged against cash for this fill.
    pub cost: f64,
    pub reason: OrderReason,
}

#[derive(Debug, Clone)]
pub struct PortfolioLedger {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: HashMap<String, Position>,
    pub trades: Vec<TradeRecord>,
    pub realized_pnl: f64,
    snapshots: Vec<LedgerSnapshot>,
}

impl PortfolioLedger {
    pub fn new(initial_capital: f64) -> Self {
        PortfolioLedger {
            cash: initial_capital,
            initial_capital,
            positions: HashMap::new(),
            trades: Vec::new(),
            realized_pnl: 0.0,
            snapshots: Vec::new(),
        }
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    /// Value of all holdings at their current mark prices.
    pub fn holdings_value(&self) -> f64 {
        self.positions.values().map(|p| p.market_value()).sum()
    }

    pub fn total_equity(&self) -> f64 {
        self.cash + self.holdings_value()
    }

    /// Read-only equity curve.
    pub fn snapshots(&self) -> &[LedgerSnapshot] {
        &self.snapshots
    }

    /// Refresh mark prices and high-water marks with today's closes, then
    /// append the date's snapshot. Positions without a bar today keep their
    /// last mark; nothing is forward-filled.
    pub fn mark_to_market(&mut self, date: NaiveDate, prices: &HashMap<String, f64>) {
        for position in self.positions.values_mut() {
            if let Some(&price) = prices.get(&position.symbol) {
                position.mark(price);
            }
        }
        let holdings_value = self.holdings_value();
        self.snapshots.push(LedgerSnapshot {
            date,
            cash: self.cash,
            holdings_value,
            total_equity: self.cash + holdings_value,
        });
    }

    /// Settle one fill against cash and holdings.
    ///
    /// Buys recompute the weighted-average cost basis; sells recognize
    /// realized P&L and leave the remaining basis untouched. The execution
    /// layer downsizes orders to respect cash; a buy that would still drive
    /// cash negative is a fatal invariant breach.
    pub fn apply_fill(
        &mut self,
        order: &Order,
        price: f64,
        cost: f64,
        date: NaiveDate,
    ) -> Result<(), RotraderError> {
        let filled = match order.side {
            Side::Buy => {
                let total = order.quantity as f64 * price + cost;
                if total > self.cash + CASH_EPSILON {
                    return Err(RotraderError::CashConstraintViolation {
                        date,
                        cash: self.cash - total,
                    });
                }
                self.cash -= total;
                self.positions
                    .entry(order.symbol.clone())
                    .and_modify(|position| position.add(order.quantity, price))
                    .or_insert_with(|| {
                        Position::open(order.symbol.clone(), order.quantity, price, date)
                    });
                order.quantity
            }
            Side::Sell => {
                let Some(position) = self.positions.get_mut(&order.symbol) else {
                    return Ok(());
                };
                let quantity = order.quantity.min(position.quantity);
                if quantity == 0 {
                    return Ok(());
                }
                let pnl = position.reduce(quantity, price);
                let emptied = position.quantity == 0;
                self.cash += quantity as f64 * price - cost;
                self.realized_pnl += pnl - cost;
                if emptied {
                    self.positions.remove(&order.symbol);
                }
                quantity
            }
        };

        self.trades.push(TradeRecord {
            date,
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: filled,
            price,
            cost,
            reason: order.reason,
        });
        Ok(())
    }
}
