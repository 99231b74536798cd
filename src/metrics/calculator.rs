//! Calculator for backtest performance metrics: win rate, Sharpe, drawdown, etc.

use std::collections::HashMap;

use statrs::statistics::Statistics;

use crate::models::{MetricsReport, SimulatedOutcome};

/// Calculator reducing simulated returns into a [`MetricsReport`].
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Calculate metrics from a list of return percentages.
    ///
    /// An empty list yields an all-zero report; no path here can divide by
    /// zero or fail.
    pub fn calculate(returns: &[f64]) -> MetricsReport {
        if returns.is_empty() {
            return MetricsReport::empty();
        }

        let total_trades = returns.len();
        let total_return_pct: f64 = returns.iter().sum();
        let avg_return_pct = total_return_pct / total_trades as f64;

        let wins: Vec<f64> = returns.iter().copied().filter(|r| *r > 0.0).collect();
        let losses: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();

        let win_rate = wins.len() as f64 / total_trades as f64;

        // Annualized as if each return were a daily observation; the sqrt(252)
        // factor is kept for comparability with existing reports.
        let sharpe_ratio = if returns.len() > 1 {
            let std_dev = returns.to_vec().std_dev();
            if std_dev > 0.0 {
                avg_return_pct / std_dev * (252.0_f64).sqrt()
            } else {
                0.0
            }
        } else {
            0.0
        };

        // Drawdown over the additive cumulative return curve. Returns are
        // summed, not compounded.
        let mut cumulative = 0.0;
        let mut running_max = f64::NEG_INFINITY;
        let mut max_drawdown_pct = 0.0;
        for r in returns {
            cumulative += r;
            if cumulative > running_max {
                running_max = cumulative;
            }
            let drawdown = running_max - cumulative;
            if drawdown > max_drawdown_pct {
                max_drawdown_pct = drawdown;
            }
        }

        let best_trade_pct = returns.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let worst_trade_pct = returns.iter().copied().fold(f64::INFINITY, f64::min);

        let gross_profit: f64 = wins.iter().sum();
        let gross_loss: f64 = losses.iter().sum::<f64>().abs();
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            f64::INFINITY
        };

        let avg_win_pct = if wins.is_empty() {
            0.0
        } else {
            wins.iter().sum::<f64>() / wins.len() as f64
        };
        let avg_loss_pct = if losses.is_empty() {
            0.0
        } else {
            losses.iter().sum::<f64>() / losses.len() as f64
        };

        MetricsReport {
            total_trades,
            total_return_pct,
            avg_return_pct,
            win_rate,
            sharpe_ratio,
            max_drawdown_pct,
            best_trade_pct,
            worst_trade_pct,
            profit_factor,
            avg_win_pct,
            avg_loss_pct,
            win_count: wins.len(),
            loss_count: losses.len(),
        }
    }

    /// Calculate metrics over a slice of simulated outcomes.
    pub fn from_outcomes(outcomes: &[SimulatedOutcome]) -> MetricsReport {
        let returns: Vec<f64> = outcomes.iter().map(|o| o.return_pct).collect();
        Self::calculate(&returns)
    }

    /// Metrics partitioned by holding period. Every requested period gets a
    /// report, zeroed when no outcome used it.
    pub fn by_holding_period(
        outcomes: &[SimulatedOutcome],
        holding_periods: &[u32],
    ) -> std::collections::BTreeMap<u32, MetricsReport> {
        holding_periods
            .iter()
            .map(|&period| {
                let period_outcomes: Vec<SimulatedOutcome> = outcomes
                    .iter()
                    .filter(|o| o.holding_period_days == period)
                    .cloned()
                    .collect();
                (period, Self::from_outcomes(&period_outcomes))
            })
            .collect()
    }

    /// Metrics grouped by ticker.
    pub fn by_ticker(outcomes: &[SimulatedOutcome]) -> HashMap<String, MetricsReport> {
        Self::grouped(outcomes, |o| o.ticker.clone())
    }

    /// Metrics grouped by filing politician.
    pub fn by_politician(outcomes: &[SimulatedOutcome]) -> HashMap<String, MetricsReport> {
        Self::grouped(outcomes, |o| o.politician.clone())
    }

    fn grouped(
        outcomes: &[SimulatedOutcome],
        key: impl Fn(&SimulatedOutcome) -> String,
    ) -> HashMap<String, MetricsReport> {
        let mut groups: HashMap<String, Vec<f64>> = HashMap::new();
        for outcome in outcomes {
            groups.entry(key(outcome)).or_default().push(outcome.return_pct);
        }

        groups
            .into_iter()
            .map(|(k, returns)| (k, Self::calculate(&returns)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn make_outcome(ticker: &str, politician: &str, period: u32, return_pct: f64) -> SimulatedOutcome {
        let entry = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        SimulatedOutcome {
            ticker: ticker.to_string(),
            politician: politician.to_string(),
            transaction_date: NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
            disclosure_date: entry,
            entry_date: entry,
            exit_date: entry + chrono::Duration::days(period as i64),
            entry_price: dec!(100),
            exit_price: dec!(110),
            return_pct,
            holding_period_days: period,
            estimated_amount: Some(dec!(32500)),
        }
    }

    #[test]
    fn test_empty_returns_zeroed_report() {
        let report = MetricsCalculator::calculate(&[]);
        assert_eq!(report, MetricsReport::empty());
    }

    #[test]
    fn test_basic_metrics() {
        let returns = [10.0, -5.0, 20.0, -10.0, 15.0];
        let report = MetricsCalculator::calculate(&returns);

        assert_eq!(report.total_trades, 5);
        assert_eq!(report.win_count, 3);
        assert_eq!(report.loss_count, 2);
        assert!((report.win_rate - 0.6).abs() < 1e-12);
        // Integer exactness of win accounting
        assert_eq!((report.win_rate * report.total_trades as f64).round() as usize, report.win_count);
        assert!((report.total_return_pct - 30.0).abs() < 1e-12);
        assert!((report.avg_return_pct - 6.0).abs() < 1e-12);
        assert!((report.best_trade_pct - 20.0).abs() < 1e-12);
        assert!((report.worst_trade_pct + 10.0).abs() < 1e-12);
        assert!((report.avg_win_pct - 15.0).abs() < 1e-12);
        assert!((report.avg_loss_pct + 7.5).abs() < 1e-12);
        assert!((report.profit_factor - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_sharpe_uses_sample_stdev() {
        // mean 6, sample stdev sqrt(670/4), annualized by sqrt(252)
        let returns = [10.0, -5.0, 20.0, -10.0, 15.0];
        let report = MetricsCalculator::calculate(&returns);

        let expected = 6.0 / (670.0_f64 / 4.0).sqrt() * (252.0_f64).sqrt();
        assert!((report.sharpe_ratio - expected).abs() < 1e-9);
    }

    #[test]
    fn test_sharpe_zero_for_single_sample() {
        let report = MetricsCalculator::calculate(&[12.5]);
        assert_eq!(report.sharpe_ratio, 0.0);
    }

    #[test]
    fn test_max_drawdown_additive() {
        // cumulative: 10, 5, 25, 15, 30 -> deepest dip is 25 - 15 = 10
        let returns = [10.0, -5.0, 20.0, -10.0, 15.0];
        let report = MetricsCalculator::calculate(&returns);
        assert!((report.max_drawdown_pct - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_profit_factor_infinite_without_losses() {
        let report = MetricsCalculator::calculate(&[5.0, 10.0]);
        assert!(report.profit_factor.is_infinite());

        let empty = MetricsCalculator::calculate(&[]);
        assert_eq!(empty.profit_factor, 0.0);
    }

    #[test]
    fn test_by_holding_period_covers_all_requested() {
        let outcomes = vec![
            make_outcome("AAPL", "Jane Doe", 30, 5.0),
            make_outcome("AAPL", "Jane Doe", 60, -2.0),
            make_outcome("MSFT", "John Roe", 30, 3.0),
        ];

        let by_period = MetricsCalculator::by_holding_period(&outcomes, &[30, 60, 90]);

        assert_eq!(by_period[&30].total_trades, 2);
        assert_eq!(by_period[&60].total_trades, 1);
        assert_eq!(by_period[&90].total_trades, 0);
        assert_eq!(by_period[&90], MetricsReport::empty());
    }

    #[test]
    fn test_grouped_by_politician() {
        let outcomes = vec![
            make_outcome("AAPL", "Jane Doe", 30, 5.0),
            make_outcome("MSFT", "Jane Doe", 30, 7.0),
            make_outcome("TSLA", "John Roe", 30, -4.0),
        ];

        let by_politician = MetricsCalculator::by_politician(&outcomes);

        assert_eq!(by_politician["Jane Doe"].total_trades, 2);
        assert!((by_politician["Jane Doe"].avg_return_pct - 6.0).abs() < 1e-12);
        assert_eq!(by_politician["John Roe"].loss_count, 1);
    }
}
