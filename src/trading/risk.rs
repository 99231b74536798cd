//! Risk management: exit rules, position sizing, and trade validation.

use anyhow::{bail, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::Position;

/// Risk management configuration.
///
/// Validated at construction; `profit_target_pct` must be positive and
/// `stop_loss_pct` negative, or exit evaluation would be nonsensical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Close a position once it gains this fraction (e.g. 0.20 = +20%)
    pub profit_target_pct: f64,

    /// Close a position once it loses to this fraction (e.g. -0.10 = -10%)
    pub stop_loss_pct: f64,

    /// Maximum fraction of capital in a single position
    pub max_position_fraction: f64,

    /// Maximum number of concurrently open positions
    pub max_open_positions: usize,

    /// Minimum dollars per position
    pub min_position_value: Decimal,
}

impl RiskConfig {
    pub fn new(
        profit_target_pct: f64,
        stop_loss_pct: f64,
        max_position_fraction: f64,
        max_open_positions: usize,
        min_position_value: Decimal,
    ) -> Result<Self> {
        if profit_target_pct <= 0.0 {
            bail!("profit_target_pct must be positive, got {profit_target_pct}");
        }
        if stop_loss_pct >= 0.0 {
            bail!("stop_loss_pct must be negative, got {stop_loss_pct}");
        }
        if !(0.0..=1.0).contains(&max_position_fraction) || max_position_fraction == 0.0 {
            bail!("max_position_fraction must be in (0, 1], got {max_position_fraction}");
        }
        if min_position_value < Decimal::ZERO {
            bail!("min_position_value must not be negative, got {min_position_value}");
        }

        Ok(Self {
            profit_target_pct,
            stop_loss_pct,
            max_position_fraction,
            max_open_positions,
            min_position_value,
        })
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            profit_target_pct: 0.20,     // 20% profit target
            stop_loss_pct: -0.10,        // 10% stop loss
            max_position_fraction: 0.05, // 5% of capital per position
            max_open_positions: 10,
            min_position_value: dec!(1000),
        }
    }
}

/// Result of an exit evaluation.
#[derive(Debug, Clone)]
pub struct ExitDecision {
    pub should_exit: bool,
    pub reason: Option<String>,
}

impl ExitDecision {
    fn stay() -> Self {
        Self {
            should_exit: false,
            reason: None,
        }
    }

    fn close(reason: impl Into<String>) -> Self {
        Self {
            should_exit: true,
            reason: Some(reason.into()),
        }
    }
}

/// Result of pre-execution trade validation.
#[derive(Debug, Clone)]
pub struct TradeValidation {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl TradeValidation {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Enforces exit rules and capital limits before any capital is committed.
pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Decide whether a position should be closed at the current price.
    ///
    /// The profit-target check runs before the stop-loss check, so a value
    /// somehow satisfying both resolves to the profit target.
    pub fn evaluate_exit(&self, position: &Position, current_price: Decimal) -> ExitDecision {
        if position.avg_entry_price.is_zero() {
            return ExitDecision::stay();
        }

        let profit_pct = ((current_price - position.avg_entry_price) / position.avg_entry_price)
            .to_f64()
            .unwrap_or(0.0);

        if profit_pct >= self.config.profit_target_pct {
            debug!(
                ticker = %position.ticker,
                profit_pct = profit_pct,
                "Profit target reached"
            );
            return ExitDecision::close(format!(
                "profit target reached at {:+.2}%",
                profit_pct * 100.0
            ));
        }

        if profit_pct <= self.config.stop_loss_pct {
            warn!(
                ticker = %position.ticker,
                profit_pct = profit_pct,
                "Stop loss triggered"
            );
            return ExitDecision::close(format!(
                "stop loss triggered at {:+.2}%",
                profit_pct * 100.0
            ));
        }

        ExitDecision::stay()
    }

    /// How many shares to buy with the given capital.
    ///
    /// Returns 0 when the position-count limit is hit, when the capital
    /// fraction falls below the minimum position value, or when not even one
    /// share is affordable.
    pub fn size_position(&self, capital: Decimal, price: Decimal, open_count: usize) -> i64 {
        if open_count >= self.config.max_open_positions {
            warn!(
                open_count = open_count,
                max = self.config.max_open_positions,
                "Max open positions reached"
            );
            return 0;
        }

        let max_fraction = Decimal::try_from(self.config.max_position_fraction)
            .unwrap_or(Decimal::ZERO);
        let max_dollars = capital * max_fraction;

        if max_dollars < self.config.min_position_value {
            warn!(
                max_dollars = %max_dollars,
                min = %self.config.min_position_value,
                "Position budget below minimum"
            );
            return 0;
        }

        if price <= Decimal::ZERO {
            return 0;
        }

        let shares = (max_dollars / price).floor().to_i64().unwrap_or(0);
        if shares < 1 {
            warn!(price = %price, "Cannot afford a single share");
            return 0;
        }

        shares
    }

    /// Validate a proposed trade before execution.
    ///
    /// Re-checks the limits independently of sizing; the first failing check
    /// names itself in the rejection reason.
    pub fn validate(
        &self,
        _ticker: &str,
        quantity: i64,
        price: Decimal,
        capital: Decimal,
        open_count: usize,
    ) -> TradeValidation {
        if open_count >= self.config.max_open_positions {
            return TradeValidation::deny(format!(
                "Max positions ({}) reached",
                self.config.max_open_positions
            ));
        }

        let total_cost = price * Decimal::from(quantity);

        if total_cost > capital {
            return TradeValidation::deny(format!(
                "Insufficient funds (need ${total_cost:.2}, have ${capital:.2})"
            ));
        }

        if total_cost < self.config.min_position_value {
            return TradeValidation::deny(format!(
                "Position value (${:.2}) below minimum (${:.2})",
                total_cost, self.config.min_position_value
            ));
        }

        let max_fraction = Decimal::try_from(self.config.max_position_fraction)
            .unwrap_or(Decimal::ZERO);
        let max_allowed = capital * max_fraction;
        if total_cost > max_allowed {
            return TradeValidation::deny(format!(
                "Position size (${total_cost:.2}) exceeds limit (${max_allowed:.2})"
            ));
        }

        TradeValidation::allow()
    }

    /// P&L for a round trip: dollars and fraction of entry.
    pub fn profit_loss(&self, entry_price: Decimal, exit_price: Decimal, quantity: i64) -> (Decimal, f64) {
        let pl_dollars = (exit_price - entry_price) * Decimal::from(quantity);
        let pl_pct = if entry_price.is_zero() {
            0.0
        } else {
            ((exit_price - entry_price) / entry_price).to_f64().unwrap_or(0.0)
        };

        (pl_dollars, pl_pct)
    }
}
