//! Ephemeral order instructions, consumed within the bar that created them.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        })
    }
}

/// Why an order was issued; carried through to the trade log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderReason {
    Rebalance,
    StopLoss,
    TrailingStop,
}

impl fmt::Display for OrderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderReason::Rebalance => "rebalance",
            OrderReason::StopLoss => "stop_loss",
            OrderReason::TrailingStop => "trailing_stop",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub symbol: String,
    pub side: Side,
    pub quantity: i64,
    pub reason: OrderReason,
}
