//! Backtesting engine: replay disclosed trades against historical prices.
//!
//! The engine models only what the public could have done: every simulated
//! entry happens on the disclosure date, never the transaction date, so the
//! disclosure lag is structural. Each surviving trade is replayed once per
//! configured holding period and the outcomes are reduced to performance
//! reports.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::api::PriceSource;
use crate::metrics::MetricsCalculator;
use crate::models::{DisclosedTrade, MetricsReport, SimulatedOutcome};
use crate::trading::StrategyPolicy;

/// Days searched on each side of a target date when the market was closed.
const PRICE_WINDOW_DAYS: i64 = 7;

/// Report progress every this many trades.
const PROGRESS_EVERY: usize = 10;

/// Pause after every this many trades to stay friendly to the price source.
const THROTTLE_EVERY: usize = 50;

/// Observer for incremental backtest progress.
///
/// Purely observational; implementations must not affect results.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, completed: usize, total: usize);
}

/// Observer that ignores all progress updates.
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_progress(&self, _completed: usize, _total: usize) {}
}

/// Full result of one backtest run.
#[derive(Debug, Clone)]
pub struct BacktestSummary {
    /// Strategy name as reported by the policy
    pub strategy: String,

    /// Disclosure-date range actually applied
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,

    /// Trades surviving the strategy filter (before price resolution)
    pub total_trades_tested: usize,

    /// All successfully simulated outcomes
    pub outcomes: Vec<SimulatedOutcome>,

    /// Tickers with at least one unresolvable price
    pub failed_tickers: Vec<String>,

    /// Metrics over every outcome
    pub overall: MetricsReport,

    /// Metrics per holding period
    pub by_period: BTreeMap<u32, MetricsReport>,
}

impl std::fmt::Display for BacktestSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n{:=^60}", " BACKTEST RESULTS ")?;
        writeln!(f)?;
        writeln!(f, "Strategy: {}", self.strategy)?;
        if let (Some(start), Some(end)) = (self.start, self.end) {
            writeln!(f, "Period:   {} to {}", start, end)?;
        }
        writeln!(
            f,
            "Tested:   {} trades ({} simulated outcomes)",
            self.total_trades_tested,
            self.outcomes.len()
        )?;
        if !self.failed_tickers.is_empty() {
            writeln!(f, "No price data for {} tickers", self.failed_tickers.len())?;
        }
        writeln!(f)?;
        write!(f, "{}", self.overall)?;

        for (period, report) in &self.by_period {
            writeln!(f)?;
            writeln!(f, "{:-^60}", format!(" {period}-day holding period "))?;
            write!(f, "{report}")?;
        }

        writeln!(f, "{:=^60}", "")?;
        Ok(())
    }
}

/// Backtesting engine.
///
/// Owns a run-scoped price cache; construct one engine per logical run (or
/// call [`clear_cache`] in between) rather than sharing an instance across
/// concurrent simulations.
///
/// [`clear_cache`]: BacktestEngine::clear_cache
pub struct BacktestEngine {
    oracle: Arc<dyn PriceSource>,
    holding_periods: Vec<u32>,
    today: NaiveDate,
    price_cache: HashMap<(String, NaiveDate), Option<Decimal>>,
}

impl BacktestEngine {
    /// Create an engine with the given price source and holding periods.
    pub fn new(oracle: Arc<dyn PriceSource>, holding_periods: Vec<u32>) -> Self {
        Self::with_today(oracle, holding_periods, Utc::now().date_naive())
    }

    /// Create an engine with a fixed "today" for deterministic replays.
    pub fn with_today(
        oracle: Arc<dyn PriceSource>,
        holding_periods: Vec<u32>,
        today: NaiveDate,
    ) -> Self {
        let holding_periods = if holding_periods.is_empty() {
            vec![30, 60, 90]
        } else {
            holding_periods
        };

        Self {
            oracle,
            holding_periods,
            today,
            price_cache: HashMap::new(),
        }
    }

    /// Empty the price cache.
    pub fn clear_cache(&mut self) {
        self.price_cache.clear();
        info!("Price cache cleared");
    }

    /// Run a backtest for one strategy over a disclosure set.
    ///
    /// Individual price failures are non-fatal: they accumulate in
    /// `failed_tickers` and the run always produces a well-formed summary,
    /// zeroed when nothing could be simulated.
    pub async fn run(
        &mut self,
        policy: &dyn StrategyPolicy,
        disclosures: &[DisclosedTrade],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        max_trades: Option<usize>,
        progress: &dyn ProgressObserver,
    ) -> BacktestSummary {
        info!(strategy = policy.name(), "Starting backtest");

        // Select on disclosure date: the earliest date a follower could act
        let mut selected: Vec<DisclosedTrade> = disclosures
            .iter()
            .filter(|t| {
                start.map_or(true, |s| t.disclosure_date >= s)
                    && end.map_or(true, |e| t.disclosure_date <= e)
            })
            .cloned()
            .collect();
        selected.sort_by_key(|t| t.disclosure_date);

        info!(count = selected.len(), "Selected disclosures in range");

        let mut filtered = policy.filter(&selected);
        info!(count = filtered.len(), "Strategy filtered trades");

        if let Some(max) = max_trades {
            filtered.truncate(max);
        }

        let total = filtered.len();
        let mut outcomes: Vec<SimulatedOutcome> = Vec::new();
        let mut failed_tickers: HashSet<String> = HashSet::new();
        let holding_periods = self.holding_periods.clone();

        for (i, trade) in filtered.iter().enumerate() {
            if i % PROGRESS_EVERY == 0 {
                progress.on_progress(i, total);
            }

            for &holding_period in &holding_periods {
                match self.simulate_trade(trade, holding_period).await {
                    Some(outcome) => outcomes.push(outcome),
                    None => {
                        // Future exits are simply not evaluable yet; only a
                        // missing price marks the ticker as failed
                        let exit_date =
                            trade.disclosure_date + chrono::Duration::days(holding_period as i64);
                        if exit_date <= self.today {
                            failed_tickers.insert(trade.ticker.clone());
                        }
                    }
                }
            }

            if i > 0 && i % THROTTLE_EVERY == 0 {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }

        info!(outcomes = outcomes.len(), "Completed backtest");
        if !failed_tickers.is_empty() {
            warn!(
                count = failed_tickers.len(),
                "Failed to resolve prices for some tickers"
            );
        }

        let overall = MetricsCalculator::from_outcomes(&outcomes);
        let by_period = MetricsCalculator::by_holding_period(&outcomes, &self.holding_periods);

        let mut failed_tickers: Vec<String> = failed_tickers.into_iter().collect();
        failed_tickers.sort();

        BacktestSummary {
            strategy: policy.name().to_string(),
            start,
            end,
            total_trades_tested: total,
            outcomes,
            failed_tickers,
            overall,
            by_period,
        }
    }

    /// Simulate one trade at one holding period.
    async fn simulate_trade(
        &mut self,
        trade: &DisclosedTrade,
        holding_period: u32,
    ) -> Option<SimulatedOutcome> {
        let entry_date = trade.disclosure_date;
        let exit_date = entry_date + chrono::Duration::days(holding_period as i64);

        // Never simulate into the future
        if exit_date > self.today {
            return None;
        }

        let entry_price = self.resolve_price(&trade.ticker, entry_date).await?;
        let exit_price = self.resolve_price(&trade.ticker, exit_date).await?;

        let return_pct =
            ((exit_price - entry_price) / entry_price * Decimal::ONE_HUNDRED).to_f64()?;

        Some(SimulatedOutcome {
            ticker: trade.ticker.clone(),
            politician: trade.politician.clone(),
            transaction_date: trade.transaction_date,
            disclosure_date: trade.disclosure_date,
            entry_date,
            exit_date,
            entry_price,
            exit_price,
            return_pct,
            holding_period_days: holding_period,
            estimated_amount: trade.estimated_amount,
        })
    }

    /// Resolve a closing price for a ticker on or near a date.
    ///
    /// Queries a window around the target to tolerate weekends and holidays,
    /// preferring the exact date and otherwise the smallest absolute
    /// day-offset. Misses are cached too, so a dead ticker costs one lookup
    /// per date.
    async fn resolve_price(&mut self, ticker: &str, date: NaiveDate) -> Option<Decimal> {
        let cache_key = (ticker.to_string(), date);
        if let Some(cached) = self.price_cache.get(&cache_key) {
            return *cached;
        }

        let window_start = date - chrono::Duration::days(PRICE_WINDOW_DAYS);
        let window_end = date + chrono::Duration::days(PRICE_WINDOW_DAYS);

        let closes = match self
            .oracle
            .daily_closes(ticker, window_start, window_end)
            .await
        {
            Ok(closes) => closes,
            Err(e) => {
                debug!(ticker = %ticker, date = %date, error = %e, "Price lookup failed");
                self.price_cache.insert(cache_key, None);
                return None;
            }
        };

        let price = closes
            .iter()
            .min_by_key(|dc| (dc.date - date).num_days().abs())
            .map(|dc| {
                if dc.date != date {
                    debug!(
                        ticker = %ticker,
                        requested = %date,
                        used = %dc.date,
                        "Using nearest trading day"
                    );
                }
                dc.close
            });

        if price.is_none() {
            debug!(ticker = %ticker, date = %date, "No price data in window");
        }

        self.price_cache.insert(cache_key, price);
        price
    }
}
