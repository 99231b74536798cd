//! Simulated trade outcome produced by the backtest engine.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Result of replaying one disclosed trade at one holding period.
///
/// Entry is always the disclosure date, so the disclosure lag is baked into
/// every outcome. Created once per (trade, holding period) pair and never
/// mutated; lives for a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedOutcome {
    /// Stock ticker symbol
    pub ticker: String,

    /// Filing politician's name
    pub politician: String,

    /// When the politician executed the trade
    pub transaction_date: NaiveDate,

    /// When the trade became public
    pub disclosure_date: NaiveDate,

    /// Simulated entry date (== disclosure date)
    pub entry_date: NaiveDate,

    /// Simulated exit date (entry + holding period)
    pub exit_date: NaiveDate,

    /// Closing price at entry
    pub entry_price: Decimal,

    /// Closing price at exit
    pub exit_price: Decimal,

    /// Simple return over the holding period, in percent
    pub return_pct: f64,

    /// Holding period in days
    pub holding_period_days: u32,

    /// Estimated dollar amount of the source disclosure
    pub estimated_amount: Option<Decimal>,
}
