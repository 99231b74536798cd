//! Congressional-Disclosure Copy-Trading Bot
//!
//! Replays disclosed congressional trades under the disclosure-lag model,
//! fuses live disclosures into per-ticker signals, and sizes entries with
//! risk-bounded position limits.

mod api;
mod backtest;
mod db;
mod metrics;
mod models;
mod trading;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::{ChartClient, PriceSource};
use crate::backtest::{BacktestEngine, ProgressObserver};
use crate::db::Database;
use crate::metrics::MetricsCalculator;
use crate::trading::{
    policy_by_name, DisclosureStore, FusionConfig, FusionMethod, RiskConfig, RiskManager,
    SignalGenerator, SignalSink, TopPerformers,
};

/// Congressional-disclosure copy-trading CLI.
#[derive(Parser)]
#[command(name = "capcopier")]
#[command(about = "Replay and follow disclosed congressional stock trades", long_about = None)]
struct Cli {
    /// Database file path
    #[arg(short, long, env = "CAPCOPIER_DATABASE", default_value = "sqlite:./capcopier.db?mode=rwc")]
    database: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import disclosure records from a CSV export
    Import {
        /// Path to the CSV file
        csv: PathBuf,
    },

    /// Run a historical backtest of a follow strategy
    Backtest {
        /// Strategy name (follow-all, top-performers, large-trades)
        #[arg(short, long, default_value = "follow-all")]
        strategy: String,

        /// Start of the disclosure-date window (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End of the disclosure-date window (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Maximum number of trades to simulate (for quick iteration)
        #[arg(short, long)]
        max_trades: Option<usize>,

        /// Minimum estimated trade value to follow
        #[arg(long)]
        min_value: Option<f64>,

        /// Number of top politicians to retain (top-performers only)
        #[arg(long, default_value = "10")]
        top_n: usize,

        /// Holding periods in days
        #[arg(long, default_values_t = vec![30, 60, 90])]
        periods: Vec<u32>,
    },

    /// Analyze recent disclosures for one ticker
    Analyze {
        /// Stock ticker symbol
        ticker: String,

        /// Days of disclosures to consider
        #[arg(short, long, default_value = "30")]
        lookback: u32,

        /// Conflict resolution method (dollar_weighted, unanimous_only, track_record)
        #[arg(long, default_value = "dollar_weighted")]
        method: String,
    },

    /// Show actionable signals across all recently disclosed tickers
    Signals {
        /// Days of disclosures to consider
        #[arg(short, long, default_value = "30")]
        lookback: u32,

        /// Minimum confidence to report
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Number of signals to show
        #[arg(short, long, default_value = "10")]
        count: usize,

        /// Conflict resolution method (dollar_weighted, unanimous_only, track_record)
        #[arg(long, default_value = "dollar_weighted")]
        method: String,
    },

    /// Review open positions against exit rules
    Positions,

    /// Show current risk management settings
    Risk,

    /// Compute a position size for a new entry
    Size {
        /// Available capital in dollars
        #[arg(short, long)]
        capital: f64,

        /// Current share price
        #[arg(short, long)]
        price: f64,

        /// Number of currently open positions
        #[arg(short, long, default_value = "0")]
        open: usize,
    },

    /// Validate a proposed trade against risk limits
    Validate {
        /// Stock ticker symbol
        ticker: String,

        /// Number of shares
        #[arg(short, long)]
        quantity: i64,

        /// Price per share
        #[arg(short, long)]
        price: f64,

        /// Available capital in dollars
        #[arg(short, long)]
        capital: f64,

        /// Number of currently open positions
        #[arg(short, long, default_value = "0")]
        open: usize,
    },
}

/// Progress reporter logging every update.
struct LoggingProgress;

impl ProgressObserver for LoggingProgress {
    fn on_progress(&self, completed: usize, total: usize) {
        info!(completed = completed, total = total, "Backtest progress");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Initialize database
    let db = Arc::new(Database::new(&cli.database).await?);

    match cli.command {
        Commands::Import { csv } => {
            let inserted = db.import_csv(&csv).await?;
            println!("Imported {} new disclosures from {}", inserted, csv.display());
        }

        Commands::Backtest {
            strategy,
            start,
            end,
            max_trades,
            min_value,
            top_n,
            periods,
        } => {
            let disclosures = db.disclosures_in_range(start, end).await?;
            if disclosures.is_empty() {
                println!("No disclosures stored for this window. Use 'capcopier import' first.");
                return Ok(());
            }

            let min_value = min_value.and_then(|v| Decimal::try_from(v).ok());
            let oracle: Arc<dyn PriceSource> = Arc::new(ChartClient::new()?);
            let mut engine = BacktestEngine::new(oracle, periods);

            let summary = if strategy.eq_ignore_ascii_case("top-performers") {
                run_top_performers(&mut engine, &disclosures, start, end, max_trades, top_n).await
            } else {
                let Some(policy) = policy_by_name(&strategy, min_value, top_n) else {
                    println!("Unknown strategy '{strategy}'. Options: follow-all, top-performers, large-trades");
                    return Ok(());
                };
                engine
                    .run(policy.as_ref(), &disclosures, start, end, max_trades, &LoggingProgress)
                    .await
            };

            println!("{summary}");

            if !summary.failed_tickers.is_empty() {
                let shown: Vec<&str> = summary
                    .failed_tickers
                    .iter()
                    .take(10)
                    .map(String::as_str)
                    .collect();
                println!(
                    "\nNo price data for {} tickers: {}",
                    summary.failed_tickers.len(),
                    shown.join(", ")
                );
            }

            // Politician leaderboard over this run's outcomes
            let by_politician = MetricsCalculator::by_politician(&summary.outcomes);
            let mut ranked: Vec<_> = by_politician.iter().collect();
            ranked.sort_by(|a, b| {
                b.1.avg_return_pct
                    .partial_cmp(&a.1.avg_return_pct)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            if !ranked.is_empty() {
                println!("\n--- Top Politicians by Avg Return ---");
                println!("{:<30} {:>8} {:>10} {:>8}", "POLITICIAN", "TRADES", "AVG RET", "WIN%");
                println!("{}", "-".repeat(60));
                for (name, report) in ranked.iter().take(5) {
                    println!(
                        "{:<30} {:>8} {:>9.2}% {:>7.1}%",
                        truncate(name, 28),
                        report.total_trades,
                        report.avg_return_pct,
                        report.win_rate * 100.0
                    );
                }
            }

            let by_ticker = MetricsCalculator::by_ticker(&summary.outcomes);
            let mut tickers: Vec<_> = by_ticker.iter().collect();
            tickers.sort_by(|a, b| {
                b.1.avg_return_pct
                    .partial_cmp(&a.1.avg_return_pct)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            if !tickers.is_empty() {
                println!("\n--- Top Tickers by Avg Return ---");
                println!("{:<8} {:>8} {:>10} {:>8}", "TICKER", "TRADES", "AVG RET", "WIN%");
                println!("{}", "-".repeat(38));
                for (ticker, report) in tickers.iter().take(5) {
                    println!(
                        "{:<8} {:>8} {:>9.2}% {:>7.1}%",
                        ticker,
                        report.total_trades,
                        report.avg_return_pct,
                        report.win_rate * 100.0
                    );
                }
            }
        }

        Commands::Analyze {
            ticker,
            lookback,
            method,
        } => {
            let ticker = ticker.trim().to_uppercase();
            let generator = make_generator(db.clone(), &method);
            let signal = generator.analyze_ticker(&ticker, lookback).await?;

            println!("\n=== Signal: {} ===", ticker);
            println!("Direction:   {}", signal.direction.as_str());
            println!("Confidence:  {:.1}%", signal.confidence * 100.0);
            println!("Method:      {}", generator.config().method.as_str());
            println!("Reason:      {}", signal.reason);
            println!("Supporting:  {} trades", signal.supporting_trades.len());
            println!("Conflicting: {} trades", signal.conflicting_trades.len());

            if !signal.supporting_trades.is_empty() {
                println!("\n--- Supporting Disclosures ---");
                for trade in signal.supporting_trades.iter().take(10) {
                    println!(
                        "  {} {} {} (disclosed {}, {}d after the trade)",
                        truncate(&trade.politician, 24),
                        trade.kind.as_str(),
                        trade
                            .estimated_amount
                            .map(|a| format!("${a:.0}"))
                            .unwrap_or_else(|| "$?".to_string()),
                        trade.disclosure_date,
                        trade.disclosure_lag_days()
                    );
                }
            }
        }

        Commands::Signals {
            lookback,
            min_confidence,
            count,
            method,
        } => {
            let generator = make_generator(db.clone(), &method);
            let signals = match min_confidence {
                Some(floor) => {
                    let mut signals = generator.recent_signals(lookback, Some(floor)).await?;
                    signals.truncate(count);
                    signals
                }
                None => generator.top_recommendations(count, lookback).await?,
            };

            if signals.is_empty() {
                println!("No actionable signals in the last {lookback} days.");
                return Ok(());
            }

            println!("\n{:<8} {:<6} {:>8} {:>10} {:>10}", "TICKER", "DIR", "CONF", "SUPPORT", "CONFLICT");
            println!("{}", "-".repeat(48));
            for signal in &signals {
                println!(
                    "{:<8} {:<6} {:>7.1}% {:>10} {:>10}",
                    signal.ticker,
                    signal.direction.as_str(),
                    signal.confidence * 100.0,
                    signal.supporting_trades.len(),
                    signal.conflicting_trades.len()
                );
            }
        }

        Commands::Positions => {
            let positions = db.open_positions().await?;
            if positions.is_empty() {
                println!("No open positions.");
                return Ok(());
            }

            let oracle = ChartClient::new()?;
            let risk = RiskManager::new(RiskConfig::default());
            let today = chrono::Utc::now().date_naive();

            println!(
                "\n{:<8} {:>8} {:>10} {:>10} {:>11} {:>9}  {}",
                "TICKER", "QTY", "ENTRY", "LAST", "VALUE", "P&L%", "ACTION"
            );
            println!("{}", "-".repeat(78));

            for mut position in positions {
                // Latest close in the last week stands in for a live quote
                let latest = oracle
                    .daily_closes(&position.ticker, today - chrono::Duration::days(7), today)
                    .await
                    .ok()
                    .and_then(|closes| closes.last().copied());

                let action = match latest {
                    Some(close) => {
                        position.update_price(close.close);
                        db.save_position(&position).await?;

                        let decision = risk.evaluate_exit(&position, close.close);
                        if decision.should_exit {
                            format!("EXIT: {}", decision.reason.unwrap_or_default())
                        } else {
                            "hold".to_string()
                        }
                    }
                    None => "no price data".to_string(),
                };

                println!(
                    "{:<8} {:>8} {:>10.2} {:>10.2} {:>11.2} {:>8.2}%  {}",
                    position.ticker,
                    position.quantity,
                    position.avg_entry_price,
                    position.current_price,
                    position.market_value(),
                    position.unrealized_pnl_pct * 100.0,
                    action
                );
            }
        }

        Commands::Risk => {
            let config = RiskConfig::default();

            println!("\n=== Risk Management Settings ===\n");
            println!("Profit Target:      {:.1}%", config.profit_target_pct * 100.0);
            println!("Stop Loss:          {:.1}%", config.stop_loss_pct * 100.0);
            println!("Max Position Size:  {:.1}% of capital", config.max_position_fraction * 100.0);
            println!("Max Open Positions: {}", config.max_open_positions);
            println!("Min Position Value: ${}", config.min_position_value);
        }

        Commands::Size {
            capital,
            price,
            open,
        } => {
            let risk = RiskManager::new(RiskConfig::default());
            let capital = Decimal::try_from(capital)?;
            let price = Decimal::try_from(price)?;

            let shares = risk.size_position(capital, price, open);
            if shares == 0 {
                println!("No position: sizing rejected by risk limits.");
            } else {
                let cost = price * Decimal::from(shares);
                println!("{shares} shares @ ${price:.2} = ${cost:.2}");
            }
        }

        Commands::Validate {
            ticker,
            quantity,
            price,
            capital,
            open,
        } => {
            let risk = RiskManager::new(RiskConfig::default());
            let price = Decimal::try_from(price)?;
            let capital = Decimal::try_from(capital)?;

            let validation = risk.validate(&ticker, quantity, price, capital, open);
            if validation.allowed {
                println!("OK: {} x{} @ ${:.2} passes all risk checks", ticker, quantity, price);
            } else {
                println!("REJECTED: {}", validation.reason.unwrap_or_default());
            }
        }
    }

    Ok(())
}

/// Two-pass top-performers run: bootstrap on all purchases, rank politicians
/// by average return, then re-filter to the top set.
async fn run_top_performers(
    engine: &mut BacktestEngine,
    disclosures: &[crate::models::DisclosedTrade],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    max_trades: Option<usize>,
    top_n: usize,
) -> backtest::BacktestSummary {
    let mut policy = TopPerformers::new(top_n, 5);

    info!("Bootstrap pass to rank politicians");
    let baseline = engine
        .run(&policy, disclosures, start, end, max_trades, &LoggingProgress)
        .await;

    let performance: HashMap<String, f64> = MetricsCalculator::by_politician(&baseline.outcomes)
        .into_iter()
        .filter(|(_, report)| report.total_trades >= policy.min_trades_required)
        .map(|(name, report)| (name, report.avg_return_pct))
        .collect();

    policy.update_top_performers(&performance);
    info!(
        retained = policy.top_politicians().len(),
        "Ranked politicians, running restricted pass"
    );

    engine
        .run(&policy, disclosures, start, end, max_trades, &LoggingProgress)
        .await
}

fn make_generator(db: Arc<Database>, method: &str) -> SignalGenerator {
    let config = FusionConfig {
        method: FusionMethod::from_str(method),
        ..Default::default()
    };
    let store: Arc<dyn DisclosureStore> = db.clone();
    let sink: Arc<dyn SignalSink> = db;
    SignalGenerator::new(config, store, Some(sink))
}

/// Truncate a string with ellipsis if too long.
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}
