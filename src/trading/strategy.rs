//! Trade-selection strategies: which disclosures to follow and at what size.
//!
//! A strategy is a pure filter plus a sizing rule. The only stateful variant
//! is [`TopPerformers`], whose politician ranking is an explicit field updated
//! between backtest passes.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::DisclosedTrade;

/// Maximum ticker length accepted by [`FollowAll`]. Longer symbols are almost
/// always artifacts of bad ticker extraction from filings, though the cutoff
/// can also drop legitimate class-share suffixes.
const MAX_TICKER_LEN: usize = 5;

/// A trade-selection and position-sizing policy.
pub trait StrategyPolicy: Send + Sync {
    /// Human-readable strategy name for reports.
    fn name(&self) -> &str;

    /// Select the disclosures this strategy would act on.
    fn filter(&self, trades: &[DisclosedTrade]) -> Vec<DisclosedTrade>;

    /// Fraction of capital (0.0 to 1.0) to allocate to one trade.
    fn position_size(&self, trade: &DisclosedTrade) -> f64;
}

/// Follow every disclosed purchase.
///
/// The baseline strategy: tests whether disclosed trading carries any edge at
/// all once the disclosure lag is accounted for.
pub struct FollowAll {
    /// Minimum estimated trade value to follow, if set
    pub min_trade_value: Option<Decimal>,

    /// Skip sales and only follow purchases (default true)
    pub exclude_sales: bool,
}

impl FollowAll {
    pub fn new(min_trade_value: Option<Decimal>, exclude_sales: bool) -> Self {
        Self {
            min_trade_value,
            exclude_sales,
        }
    }
}

impl Default for FollowAll {
    fn default() -> Self {
        Self::new(None, true)
    }
}

impl StrategyPolicy for FollowAll {
    fn name(&self) -> &str {
        "Follow All Trades"
    }

    fn filter(&self, trades: &[DisclosedTrade]) -> Vec<DisclosedTrade> {
        trades
            .iter()
            .filter(|trade| {
                if self.exclude_sales && trade.kind.is_sale() {
                    return false;
                }

                if let (Some(min), Some(amount)) = (self.min_trade_value, trade.estimated_amount) {
                    if amount < min {
                        return false;
                    }
                }

                !trade.ticker.is_empty() && trade.ticker.len() <= MAX_TICKER_LEN
            })
            .cloned()
            .collect()
    }

    fn position_size(&self, _trade: &DisclosedTrade) -> f64 {
        // Equal weight: 1% of portfolio per trade
        0.01
    }
}

/// Follow only politicians who have historically outperformed.
///
/// Runs in two phases: with an empty ranking the filter passes every purchase
/// through to establish a baseline; after [`update_top_performers`] the filter
/// restricts to purchases from the retained set. Callers run one pass, rank
/// politicians from its per-politician metrics, update, then re-filter.
///
/// [`update_top_performers`]: TopPerformers::update_top_performers
pub struct TopPerformers {
    /// Number of top performers to retain
    pub top_n: usize,

    /// Minimum trade count for a politician to be ranked
    pub min_trades_required: usize,

    /// Ranked politician set; empty until the first update
    top_politicians: HashSet<String>,
}

impl TopPerformers {
    pub fn new(top_n: usize, min_trades_required: usize) -> Self {
        Self {
            top_n,
            min_trades_required,
            top_politicians: HashSet::new(),
        }
    }

    /// Replace the ranking with the top N politicians by average return.
    pub fn update_top_performers(&mut self, performance: &HashMap<String, f64>) {
        let mut ranked: Vec<(&String, &f64)> = performance.iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));

        self.top_politicians = ranked
            .into_iter()
            .take(self.top_n)
            .map(|(name, _)| name.clone())
            .collect();
    }

    /// Politicians currently retained by the ranking.
    pub fn top_politicians(&self) -> &HashSet<String> {
        &self.top_politicians
    }
}

impl Default for TopPerformers {
    fn default() -> Self {
        Self::new(10, 5)
    }
}

impl StrategyPolicy for TopPerformers {
    fn name(&self) -> &str {
        "Follow Top Performers"
    }

    fn filter(&self, trades: &[DisclosedTrade]) -> Vec<DisclosedTrade> {
        if self.top_politicians.is_empty() {
            // Bootstrap pass: all purchases, so a baseline ranking exists
            return trades
                .iter()
                .filter(|t| t.kind.is_purchase())
                .cloned()
                .collect();
        }

        trades
            .iter()
            .filter(|t| t.kind.is_purchase() && self.top_politicians.contains(&t.politician))
            .cloned()
            .collect()
    }

    fn position_size(&self, _trade: &DisclosedTrade) -> f64 {
        // Higher conviction in ranked politicians: 2% per trade
        0.02
    }
}

/// Follow only purchases above a dollar threshold.
///
/// Hypothesis: larger disclosed trades signal higher conviction.
pub struct LargeTrades {
    /// Minimum estimated trade value in dollars
    pub min_trade_value: Decimal,
}

impl LargeTrades {
    pub fn new(min_trade_value: Decimal) -> Self {
        Self { min_trade_value }
    }
}

impl Default for LargeTrades {
    fn default() -> Self {
        Self::new(dec!(50000))
    }
}

impl StrategyPolicy for LargeTrades {
    fn name(&self) -> &str {
        "Follow Large Trades"
    }

    fn filter(&self, trades: &[DisclosedTrade]) -> Vec<DisclosedTrade> {
        trades
            .iter()
            .filter(|t| {
                t.kind.is_purchase()
                    && t.estimated_amount
                        .map(|amount| amount >= self.min_trade_value)
                        .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    fn position_size(&self, trade: &DisclosedTrade) -> f64 {
        let Some(amount) = trade.estimated_amount else {
            return 0.01;
        };

        // Tiered by trade size: $500K+ gets 3%, $100K+ gets 2%, else 1%
        if amount >= dec!(500000) {
            0.03
        } else if amount >= dec!(100000) {
            0.02
        } else {
            0.01
        }
    }
}

/// Build a boxed policy by CLI name.
pub fn policy_by_name(
    name: &str,
    min_trade_value: Option<Decimal>,
    top_n: usize,
) -> Option<Box<dyn StrategyPolicy>> {
    match name.to_lowercase().as_str() {
        "follow-all" | "follow_all" => Some(Box::new(FollowAll::new(min_trade_value, true))),
        "top-performers" | "top_performers" => Some(Box::new(TopPerformers::new(top_n, 5))),
        "large-trades" | "large_trades" => Some(Box::new(LargeTrades::new(
            min_trade_value.unwrap_or_else(|| dec!(50000)),
        ))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;
    use chrono::NaiveDate;

    fn make_trade(
        politician: &str,
        ticker: &str,
        kind: TransactionKind,
        amount: Option<Decimal>,
    ) -> DisclosedTrade {
        DisclosedTrade {
            politician: politician.to_string(),
            party: Some("D".to_string()),
            ticker: ticker.to_string(),
            kind,
            transaction_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            disclosure_date: NaiveDate::from_ymd_opt(2024, 2, 16).unwrap(),
            amount_range: String::new(),
            estimated_amount: amount,
        }
    }

    #[test]
    fn test_follow_all_drops_sales_and_long_tickers() {
        let trades = vec![
            make_trade("Jane Doe", "AAPL", TransactionKind::Purchase, Some(dec!(32500))),
            make_trade("Jane Doe", "AAPL", TransactionKind::Sale, Some(dec!(32500))),
            make_trade("John Roe", "GOOGLE", TransactionKind::Purchase, Some(dec!(8000))),
            make_trade("John Roe", "", TransactionKind::Purchase, Some(dec!(8000))),
        ];

        let policy = FollowAll::default();
        let filtered = policy.filter(&trades);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].ticker, "AAPL");
        assert_eq!(filtered[0].kind, TransactionKind::Purchase);
    }

    #[test]
    fn test_follow_all_keeps_sales_when_configured() {
        let trades = vec![
            make_trade("Jane Doe", "AAPL", TransactionKind::Sale, Some(dec!(32500))),
        ];

        let policy = FollowAll::new(None, false);
        assert_eq!(policy.filter(&trades).len(), 1);
    }

    #[test]
    fn test_follow_all_min_value_filter() {
        let trades = vec![
            make_trade("Jane Doe", "AAPL", TransactionKind::Purchase, Some(dec!(8000))),
            make_trade("Jane Doe", "MSFT", TransactionKind::Purchase, Some(dec!(75000))),
            make_trade("Jane Doe", "TSLA", TransactionKind::Purchase, None),
        ];

        let policy = FollowAll::new(Some(dec!(50000)), true);
        let filtered = policy.filter(&trades);

        // Trades without an estimated amount pass the value filter
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().any(|t| t.ticker == "MSFT"));
        assert!(filtered.iter().any(|t| t.ticker == "TSLA"));
    }

    #[test]
    fn test_follow_all_fixed_sizing() {
        let trade = make_trade("Jane Doe", "AAPL", TransactionKind::Purchase, Some(dec!(900000)));
        assert_eq!(FollowAll::default().position_size(&trade), 0.01);
    }

    #[test]
    fn test_top_performers_bootstrap_passes_all_purchases() {
        let trades = vec![
            make_trade("Jane Doe", "AAPL", TransactionKind::Purchase, Some(dec!(32500))),
            make_trade("John Roe", "MSFT", TransactionKind::Purchase, Some(dec!(32500))),
            make_trade("John Roe", "MSFT", TransactionKind::Sale, Some(dec!(32500))),
        ];

        let policy = TopPerformers::new(1, 5);
        let filtered = policy.filter(&trades);

        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|t| t.kind.is_purchase()));
    }

    #[test]
    fn test_top_performers_restricts_after_update() {
        let trades = vec![
            make_trade("Jane Doe", "AAPL", TransactionKind::Purchase, Some(dec!(32500))),
            make_trade("John Roe", "MSFT", TransactionKind::Purchase, Some(dec!(32500))),
        ];

        let mut policy = TopPerformers::new(1, 5);

        let mut performance = HashMap::new();
        performance.insert("Jane Doe".to_string(), 12.5);
        performance.insert("John Roe".to_string(), -3.0);
        policy.update_top_performers(&performance);

        let filtered = policy.filter(&trades);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].politician, "Jane Doe");
        assert!(policy.top_politicians().contains("Jane Doe"));
    }

    #[test]
    fn test_top_performers_sizing() {
        let trade = make_trade("Jane Doe", "AAPL", TransactionKind::Purchase, None);
        assert_eq!(TopPerformers::default().position_size(&trade), 0.02);
    }

    #[test]
    fn test_large_trades_threshold() {
        let trades = vec![
            make_trade("Jane Doe", "AAPL", TransactionKind::Purchase, Some(dec!(75000))),
            make_trade("Jane Doe", "MSFT", TransactionKind::Purchase, Some(dec!(8000))),
            make_trade("Jane Doe", "TSLA", TransactionKind::Purchase, None),
            make_trade("Jane Doe", "NVDA", TransactionKind::Sale, Some(dec!(750000))),
        ];

        let policy = LargeTrades::default();
        let filtered = policy.filter(&trades);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].ticker, "AAPL");
    }

    #[test]
    fn test_large_trades_tiered_sizing() {
        let policy = LargeTrades::default();

        let small = make_trade("J", "A", TransactionKind::Purchase, Some(dec!(75000)));
        let medium = make_trade("J", "A", TransactionKind::Purchase, Some(dec!(250000)));
        let large = make_trade("J", "A", TransactionKind::Purchase, Some(dec!(500000)));

        assert_eq!(policy.position_size(&small), 0.01);
        assert_eq!(policy.position_size(&medium), 0.02);
        assert_eq!(policy.position_size(&large), 0.03);
    }

    #[test]
    fn test_policy_by_name() {
        assert!(policy_by_name("follow-all", None, 10).is_some());
        assert!(policy_by_name("top-performers", None, 10).is_some());
        assert!(policy_by_name("large-trades", None, 10).is_some());
        assert!(policy_by_name("momentum", None, 10).is_none());
    }
}
