//! Position model representing a current stock holding.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An open position in a single ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Stock ticker symbol
    pub ticker: String,

    /// Number of shares held
    pub quantity: i64,

    /// Average entry price per share
    pub avg_entry_price: Decimal,

    /// Last observed market price per share
    #[serde(default)]
    pub current_price: Decimal,

    /// Unrealized P&L in dollars
    #[serde(default)]
    pub unrealized_pnl: Decimal,

    /// Unrealized P&L as a fraction of cost basis
    #[serde(default)]
    pub unrealized_pnl_pct: f64,

    /// Last time this position was marked to market
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl Position {
    /// Create a new position from an entry fill.
    pub fn new(ticker: String, quantity: i64, entry_price: Decimal) -> Self {
        Self {
            ticker,
            quantity,
            avg_entry_price: entry_price,
            current_price: entry_price,
            unrealized_pnl: Decimal::ZERO,
            unrealized_pnl_pct: 0.0,
            last_updated: Utc::now(),
        }
    }

    /// Mark the position to the given market price.
    pub fn update_price(&mut self, current_price: Decimal) {
        self.current_price = current_price;

        let cost_basis = self.avg_entry_price * Decimal::from(self.quantity);
        let market_value = current_price * Decimal::from(self.quantity);
        self.unrealized_pnl = market_value - cost_basis;

        if !self.avg_entry_price.is_zero() {
            self.unrealized_pnl_pct = ((current_price - self.avg_entry_price)
                / self.avg_entry_price)
                .to_f64()
                .unwrap_or(0.0);
        }

        self.last_updated = Utc::now();
    }

    /// Current market value of the holding.
    pub fn market_value(&self) -> Decimal {
        self.current_price * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_position_mark_to_market() {
        let mut pos = Position::new("AAPL".to_string(), 50, dec!(100));

        assert_eq!(pos.unrealized_pnl, dec!(0));

        pos.update_price(dec!(110));
        assert_eq!(pos.unrealized_pnl, dec!(500));
        assert!((pos.unrealized_pnl_pct - 0.10).abs() < 1e-9);

        pos.update_price(dec!(90));
        assert_eq!(pos.unrealized_pnl, dec!(-500));
        assert!((pos.unrealized_pnl_pct + 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_market_value() {
        let mut pos = Position::new("MSFT".to_string(), 10, dec!(300));
        pos.update_price(dec!(310));
        assert_eq!(pos.market_value(), dec!(3100));
    }
}
