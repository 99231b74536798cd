//! Aggregate performance report for a set of simulated outcomes.

use serde::{Deserialize, Serialize};

/// Performance statistics over a list of simulated returns.
///
/// Derived and recomputable; all fields are zero for an empty outcome set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Number of simulated outcomes
    pub total_trades: usize,

    /// Sum of all return percentages
    pub total_return_pct: f64,

    /// Mean return percentage
    pub avg_return_pct: f64,

    /// Fraction of outcomes with positive return (0.0 to 1.0)
    pub win_rate: f64,

    /// Annualized Sharpe ratio: mean / sample stdev * sqrt(252).
    ///
    /// Each simulated return is treated as a daily observation regardless of
    /// the actual holding period, so the figure is only comparable across
    /// runs using this same convention.
    pub sharpe_ratio: f64,

    /// Maximum peak-to-trough decline of the additive cumulative return
    /// curve, in percentage points
    pub max_drawdown_pct: f64,

    /// Best single return percentage
    pub best_trade_pct: f64,

    /// Worst single return percentage
    pub worst_trade_pct: f64,

    /// Gross profit / gross loss. `f64::INFINITY` when there are wins and no
    /// losses; does not survive a JSON round trip in that case.
    pub profit_factor: f64,

    /// Mean winning return percentage
    pub avg_win_pct: f64,

    /// Mean losing return percentage (negative)
    pub avg_loss_pct: f64,

    /// Number of winning outcomes
    pub win_count: usize,

    /// Number of losing outcomes
    pub loss_count: usize,
}

impl MetricsReport {
    /// All-zero report for an empty outcome set.
    pub fn empty() -> Self {
        Self {
            total_trades: 0,
            total_return_pct: 0.0,
            avg_return_pct: 0.0,
            win_rate: 0.0,
            sharpe_ratio: 0.0,
            max_drawdown_pct: 0.0,
            best_trade_pct: 0.0,
            worst_trade_pct: 0.0,
            profit_factor: 0.0,
            avg_win_pct: 0.0,
            avg_loss_pct: 0.0,
            win_count: 0,
            loss_count: 0,
        }
    }
}

impl Default for MetricsReport {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "--- Trades ---")?;
        writeln!(f, "Total:        {}", self.total_trades)?;
        writeln!(
            f,
            "Winners:      {} ({:.1}%)",
            self.win_count,
            self.win_rate * 100.0
        )?;
        writeln!(f, "Losers:       {}", self.loss_count)?;
        writeln!(f, "Avg Win:      {:.2}%", self.avg_win_pct)?;
        writeln!(f, "Avg Loss:     {:.2}%", self.avg_loss_pct)?;
        if self.profit_factor.is_infinite() {
            writeln!(f, "Profit Factor: inf")?;
        } else {
            writeln!(f, "Profit Factor: {:.2}", self.profit_factor)?;
        }
        writeln!(f)?;
        writeln!(f, "--- Returns ---")?;
        writeln!(f, "Total Return: {:.2}%", self.total_return_pct)?;
        writeln!(f, "Avg Return:   {:.2}%", self.avg_return_pct)?;
        writeln!(f, "Best Trade:   {:.2}%", self.best_trade_pct)?;
        writeln!(f, "Worst Trade:  {:.2}%", self.worst_trade_pct)?;
        writeln!(f)?;
        writeln!(f, "--- Risk ---")?;
        writeln!(f, "Sharpe Ratio: {:.2}", self.sharpe_ratio)?;
        writeln!(f, "Max Drawdown: {:.2}%", self.max_drawdown_pct)?;
        Ok(())
    }
}
