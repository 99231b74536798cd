//! SQLite persistence for disclosures, open positions, and recorded signals.
//!
//! The decision pipeline treats this store as a read-only collaborator for
//! disclosures; writes happen at ingest time (CSV import) and through the
//! signal sink.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::models::{estimate_amount, DisclosedTrade, Position, SignalDirection, TransactionKind};
use crate::trading::{DisclosureStore, FusionMethod, SignalSink};

/// Database connection pool.
pub struct Database {
    pool: SqlitePool,
}

/// Raw disclosure row; dates are ISO-8601 TEXT, amounts REAL.
#[derive(Debug, Clone, sqlx::FromRow)]
struct DisclosureRow {
    politician: String,
    party: Option<String>,
    ticker: String,
    transaction_type: String,
    transaction_date: NaiveDate,
    disclosure_date: NaiveDate,
    amount_range: String,
    estimated_amount: Option<f64>,
}

impl DisclosureRow {
    fn into_model(self) -> Result<DisclosedTrade> {
        Ok(DisclosedTrade {
            politician: self.politician,
            party: self.party,
            ticker: self.ticker,
            kind: TransactionKind::parse(&self.transaction_type)?,
            transaction_date: self.transaction_date,
            disclosure_date: self.disclosure_date,
            amount_range: self.amount_range,
            estimated_amount: self
                .estimated_amount
                .and_then(|a| Decimal::try_from(a).ok()),
        })
    }
}

/// Raw position row.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PositionRow {
    ticker: String,
    quantity: i64,
    avg_entry_price: f64,
    current_price: f64,
    unrealized_pnl: f64,
    unrealized_pnl_pct: f64,
    last_updated: String,
}

impl PositionRow {
    fn into_model(self) -> Position {
        Position {
            ticker: self.ticker,
            quantity: self.quantity,
            avg_entry_price: Decimal::try_from(self.avg_entry_price).unwrap_or_default(),
            current_price: Decimal::try_from(self.current_price).unwrap_or_default(),
            unrealized_pnl: Decimal::try_from(self.unrealized_pnl).unwrap_or_default(),
            unrealized_pnl_pct: self.unrealized_pnl_pct,
            last_updated: self
                .last_updated
                .parse()
                .unwrap_or_else(|_| Utc::now()),
        }
    }
}

/// One row of a disclosure CSV export.
#[derive(Debug, Deserialize)]
struct CsvDisclosure {
    politician: String,
    #[serde(default)]
    party: Option<String>,
    ticker: String,
    transaction_type: String,
    transaction_date: NaiveDate,
    disclosure_date: NaiveDate,
    #[serde(default)]
    amount_range: String,
}

impl Database {
    /// Connect and run migrations.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS disclosures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                politician TEXT NOT NULL,
                party TEXT,
                ticker TEXT NOT NULL,
                transaction_type TEXT NOT NULL,
                transaction_date TEXT NOT NULL,
                disclosure_date TEXT NOT NULL,
                amount_range TEXT NOT NULL DEFAULT '',
                estimated_amount REAL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (politician, ticker, transaction_type, transaction_date, amount_range)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_disclosures_ticker ON disclosures (ticker)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_disclosures_disclosed ON disclosures (disclosure_date)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS positions (
                ticker TEXT PRIMARY KEY,
                quantity INTEGER NOT NULL,
                avg_entry_price REAL NOT NULL,
                current_price REAL NOT NULL DEFAULT 0,
                unrealized_pnl REAL NOT NULL DEFAULT 0,
                unrealized_pnl_pct REAL NOT NULL DEFAULT 0,
                last_updated TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS signal_accuracy (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                signal_timestamp TEXT NOT NULL,
                ticker TEXT NOT NULL,
                predicted_signal TEXT NOT NULL,
                predicted_confidence REAL NOT NULL,
                method TEXT NOT NULL,
                actual_outcome TEXT,
                actual_pnl_pct REAL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert disclosures, ignoring exact duplicates. Returns the number of
    /// newly stored rows.
    pub async fn insert_disclosures(&self, trades: &[DisclosedTrade]) -> Result<u64> {
        let mut inserted = 0u64;

        for trade in trades {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO disclosures
                    (politician, party, ticker, transaction_type,
                     transaction_date, disclosure_date, amount_range, estimated_amount)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&trade.politician)
            .bind(&trade.party)
            .bind(&trade.ticker)
            .bind(trade.kind.as_str())
            .bind(trade.transaction_date)
            .bind(trade.disclosure_date)
            .bind(&trade.amount_range)
            .bind(trade.estimated_amount.and_then(|a| a.to_f64()))
            .execute(&self.pool)
            .await?;

            inserted += result.rows_affected();
        }

        debug!(inserted = inserted, total = trades.len(), "Stored disclosures");
        Ok(inserted)
    }

    /// Disclosures whose disclosure date falls in the given range, ordered by
    /// disclosure date ascending.
    pub async fn disclosures_in_range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<DisclosedTrade>> {
        let rows: Vec<DisclosureRow> = sqlx::query_as(
            r#"
            SELECT politician, party, ticker, transaction_type,
                   transaction_date, disclosure_date, amount_range, estimated_amount
            FROM disclosures
            WHERE (?1 IS NULL OR disclosure_date >= ?1)
              AND (?2 IS NULL OR disclosure_date <= ?2)
            ORDER BY disclosure_date ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DisclosureRow::into_model).collect()
    }

    /// Disclosures for one ticker disclosed on or after the cutoff date.
    pub async fn disclosures_for_ticker(
        &self,
        ticker: &str,
        since: NaiveDate,
    ) -> Result<Vec<DisclosedTrade>> {
        let rows: Vec<DisclosureRow> = sqlx::query_as(
            r#"
            SELECT politician, party, ticker, transaction_type,
                   transaction_date, disclosure_date, amount_range, estimated_amount
            FROM disclosures
            WHERE ticker = ?1 AND disclosure_date >= ?2
            ORDER BY disclosure_date ASC
            "#,
        )
        .bind(ticker)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DisclosureRow::into_model).collect()
    }

    /// Distinct tickers disclosed on or after the cutoff date.
    pub async fn tickers_since(&self, since: NaiveDate) -> Result<Vec<String>> {
        let tickers: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT ticker FROM disclosures WHERE disclosure_date >= ?1 ORDER BY ticker",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickers.into_iter().map(|(t,)| t).collect())
    }

    /// All currently open positions.
    pub async fn open_positions(&self) -> Result<Vec<Position>> {
        let rows: Vec<PositionRow> = sqlx::query_as(
            r#"
            SELECT ticker, quantity, avg_entry_price, current_price,
                   unrealized_pnl, unrealized_pnl_pct, last_updated
            FROM positions
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PositionRow::into_model).collect())
    }

    /// Insert or replace a position.
    pub async fn save_position(&self, position: &Position) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO positions
                (ticker, quantity, avg_entry_price, current_price,
                 unrealized_pnl, unrealized_pnl_pct, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&position.ticker)
        .bind(position.quantity)
        .bind(position.avg_entry_price.to_f64().unwrap_or(0.0))
        .bind(position.current_price.to_f64().unwrap_or(0.0))
        .bind(position.unrealized_pnl.to_f64().unwrap_or(0.0))
        .bind(position.unrealized_pnl_pct)
        .bind(position.last_updated.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a closed position.
    pub async fn remove_position(&self, ticker: &str) -> Result<()> {
        sqlx::query("DELETE FROM positions WHERE ticker = ?")
            .bind(ticker)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Import disclosures from a CSV export.
    ///
    /// Expected headers: politician, party, ticker, transaction_type,
    /// transaction_date, disclosure_date, amount_range. Dates are ISO-8601.
    pub async fn import_csv(&self, path: &Path) -> Result<u64> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

        let mut trades = Vec::new();
        for record in reader.deserialize() {
            let record: CsvDisclosure = record.context("Malformed CSV record")?;
            let kind = TransactionKind::parse(&record.transaction_type)?;
            let estimated_amount = if record.amount_range.is_empty() {
                None
            } else {
                Some(estimate_amount(&record.amount_range))
            };

            trades.push(DisclosedTrade {
                politician: record.politician,
                party: record.party,
                ticker: record.ticker.trim().to_uppercase(),
                kind,
                transaction_date: record.transaction_date,
                disclosure_date: record.disclosure_date,
                amount_range: record.amount_range,
                estimated_amount,
            });
        }

        let inserted = self.insert_disclosures(&trades).await?;
        info!(
            inserted = inserted,
            parsed = trades.len(),
            file = %path.display(),
            "Imported disclosures from CSV"
        );

        Ok(inserted)
    }
}

#[async_trait]
impl DisclosureStore for Database {
    async fn trades_for_ticker(
        &self,
        ticker: &str,
        lookback_days: u32,
    ) -> Result<Vec<DisclosedTrade>> {
        let since = Utc::now().date_naive() - chrono::Duration::days(lookback_days as i64);
        self.disclosures_for_ticker(ticker, since).await
    }

    async fn recent_tickers(&self, lookback_days: u32) -> Result<Vec<String>> {
        let since = Utc::now().date_naive() - chrono::Duration::days(lookback_days as i64);
        self.tickers_since(since).await
    }
}

#[async_trait]
impl SignalSink for Database {
    async fn record_signal(
        &self,
        ticker: &str,
        direction: SignalDirection,
        confidence: f64,
        method: FusionMethod,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO signal_accuracy
                (signal_timestamp, ticker, predicted_signal, predicted_confidence, method)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(ticker)
        .bind(direction.as_str())
        .bind(confidence)
        .bind(method.as_str())
        .execute(&self.pool)
        .await?;

        debug!(ticker = %ticker, direction = direction.as_str(), "Recorded signal");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_trade(politician: &str, ticker: &str, disclosed: NaiveDate) -> DisclosedTrade {
        DisclosedTrade {
            politician: politician.to_string(),
            party: Some("R".to_string()),
            ticker: ticker.to_string(),
            kind: TransactionKind::Purchase,
            transaction_date: disclosed - chrono::Duration::days(45),
            disclosure_date: disclosed,
            amount_range: "$15,001 - $50,000".to_string(),
            estimated_amount: Some(dec!(32500.5)),
        }
    }

    async fn memory_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_query_range() {
        let db = memory_db().await;

        let trades = vec![
            make_trade("Jane Doe", "AAPL", date(2024, 3, 10)),
            make_trade("John Roe", "MSFT", date(2024, 3, 1)),
            make_trade("Jane Doe", "TSLA", date(2024, 5, 1)),
        ];
        assert_eq!(db.insert_disclosures(&trades).await.unwrap(), 3);

        // Duplicates are ignored
        assert_eq!(db.insert_disclosures(&trades).await.unwrap(), 0);

        let in_march = db
            .disclosures_in_range(Some(date(2024, 3, 1)), Some(date(2024, 3, 31)))
            .await
            .unwrap();

        assert_eq!(in_march.len(), 2);
        // Ordered by disclosure date ascending
        assert_eq!(in_march[0].ticker, "MSFT");
        assert_eq!(in_march[1].ticker, "AAPL");
        assert_eq!(in_march[1].estimated_amount, Some(dec!(32500.5)));
    }

    #[tokio::test]
    async fn test_disclosures_for_ticker() {
        let db = memory_db().await;

        db.insert_disclosures(&[
            make_trade("Jane Doe", "AAPL", date(2024, 3, 10)),
            make_trade("John Roe", "AAPL", date(2024, 1, 5)),
            make_trade("Jane Doe", "MSFT", date(2024, 3, 12)),
        ])
        .await
        .unwrap();

        let recent = db
            .disclosures_for_ticker("AAPL", date(2024, 3, 1))
            .await
            .unwrap();

        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].politician, "Jane Doe");
    }

    #[tokio::test]
    async fn test_tickers_since() {
        let db = memory_db().await;

        db.insert_disclosures(&[
            make_trade("Jane Doe", "AAPL", date(2024, 3, 10)),
            make_trade("John Roe", "MSFT", date(2024, 3, 12)),
            make_trade("Jane Doe", "AAPL", date(2024, 3, 15)),
            make_trade("Old Filer", "TSLA", date(2023, 1, 1)),
        ])
        .await
        .unwrap();

        let tickers = db.tickers_since(date(2024, 1, 1)).await.unwrap();
        assert_eq!(tickers, vec!["AAPL", "MSFT"]);
    }

    #[tokio::test]
    async fn test_position_roundtrip() {
        let db = memory_db().await;

        let mut position = Position::new("AAPL".to_string(), 50, dec!(100));
        position.update_price(dec!(110));
        db.save_position(&position).await.unwrap();

        let loaded = db.open_positions().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].quantity, 50);
        assert_eq!(loaded[0].avg_entry_price, dec!(100));
        assert!((loaded[0].unrealized_pnl_pct - 0.10).abs() < 1e-9);

        db.remove_position("AAPL").await.unwrap();
        assert!(db.open_positions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_signal() {
        let db = memory_db().await;

        db.record_signal("AAPL", SignalDirection::Buy, 0.91, FusionMethod::DollarWeighted)
            .await
            .unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM signal_accuracy")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_csv_import() {
        let db = memory_db().await;

        let csv = "politician,party,ticker,transaction_type,transaction_date,disclosure_date,amount_range\n\
                   Jane Doe,D,aapl,Purchase,2024-01-02,2024-02-16,\"$15,001 - $50,000\"\n\
                   John Roe,R,MSFT,Sale,2024-01-10,2024-02-20,\"$1,001 - $15,000\"\n";

        let path = std::env::temp_dir().join(format!("capcopier-test-{}.csv", std::process::id()));
        std::fs::write(&path, csv).unwrap();

        let inserted = db.import_csv(&path).await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(inserted, 2);

        let all = db.disclosures_in_range(None, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].ticker, "AAPL"); // normalized to uppercase
        assert_eq!(all[0].estimated_amount, Some(dec!(32500.5)));
        assert_eq!(all[1].kind, TransactionKind::Sale);
    }
}
