//! Open-position state: cost basis, high-water mark, mark price.

use chrono::NaiveDate;

/// A long holding in one instrument. Owned exclusively by the ledger;
/// created on the first fill, destroyed when quantity returns to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub quantity: i64,
    /// Quantity-weighted average entry price.
    pub avg_cost: f64,
    pub entry_date: NaiveDate,
    /// Highest mark price seen since entry; never decreases while open.
    pub high_water_mark: f64,
    /// Most recent price used to value the position.
    pub last_price: f64,
}

impl Position {
    pub fn open(symbol: String, quantity: i64, price: f64, date: NaiveDate) -> Self {
        Position {
            symbol,
            quantity,
            avg_cost: price,
            entry_date: date,
            high_water_mark: price,
            last_price: price,
        }
    }

    pub fn market_value(&self) -> f64 {
        self.quantity as f64 * self.last_price
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.quantity as f64 * (self.last_price - self.avg_cost)
    }

    /// Record a new mark price, ratcheting the high-water mark.
    pub fn mark(&mut self, price: f64) {
        self.last_price = price;
        if price > self.high_water_mark {
            self.high_water_mark = price;
        }
    }

    /// Fold a partial buy into the weighted-average cost basis.
    pub fn add(&mut self, quantity: i64, price: f64) {
        let old_qty = self.quantity as f64;
        let new_qty = quantity as f64;
        self.avg_cost = (old_qty * self.avg_cost + new_qty * price) / (old_qty + new_qty);
        self.quantity += quantity;
        self.mark(price);
    }

    /// Sell `quantity` shares at `price`, returning the realized P&L.
    /// The remaining shares keep their cost basis.
    pub fn reduce(&mut self, quantity: i64, price: f64) -> f64 {
        debug_assert!(quantity <= self.quantity);
        self.quantity -= quantity;
        self.last_price = price;
        quantity as f64 * (price - self.avg_cost)
    }

    /// Return from average cost, the stop-loss reference.
    pub fn return_from_cost(&self, price: f64) -> f64 {
        price / self.avg_cost - 1.0
    }

    /// Return from the high-water mark, the trailing-stop reference.
    pub fn return_from_high_water(&self, price: f64) -> f64 {
        price / self.high_water_mark - 1.0
    }
}
