//! Market-data access: the price-source seam and its HTTP implementation.

mod price_client;
mod types;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

pub use price_client::ChartClient;
pub use types::*;

/// One trading day's closing price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: Decimal,
}

/// Source of historical closing prices.
///
/// Implementations return whatever trading days fall inside `[start, end]`;
/// an empty vec means no data, not an error. The backtest engine layers
/// nearest-date resolution and caching on top.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>>;
}
