//! HTTP client fetching historical daily closes from a chart API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use chrono::{NaiveDate, TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::debug;

use super::types::ChartResponse;
use super::{DailyClose, PriceSource};

const CHART_API_BASE: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRY_ELAPSED: Duration = Duration::from_secs(15);

/// Read-only client for the daily-close chart endpoint.
pub struct ChartClient {
    client: Client,
    base_url: String,
}

impl ChartClient {
    /// Create a new chart client with default settings.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent("capcopier/0.1")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: CHART_API_BASE.to_string(),
        })
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    async fn fetch_chart(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ChartResponse> {
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        // period2 is exclusive; push it one day past the requested end
        let period2 = (end + chrono::Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();

        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
            self.base_url, ticker, period1, period2
        );

        debug!(url = %url, "Fetching daily closes");

        let retry_policy = ExponentialBackoff {
            max_elapsed_time: Some(MAX_RETRY_ELAPSED),
            ..Default::default()
        };

        let response = backoff::future::retry(retry_policy, || async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(anyhow::Error::from(e)))?;

            let status = response.status();
            if status.is_server_error() {
                return Err(backoff::Error::transient(anyhow::anyhow!(
                    "Chart request failed: {status}"
                )));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(backoff::Error::permanent(anyhow::anyhow!(
                    "Chart request failed: {status} - {body}"
                )));
            }

            Ok(response)
        })
        .await?;

        response
            .json()
            .await
            .context("Failed to parse chart response")
    }
}

#[async_trait]
impl PriceSource for ChartClient {
    async fn daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>> {
        let chart = self.fetch_chart(ticker, start, end).await?.chart;

        if let Some(error) = chart.error {
            anyhow::bail!("Chart API error for {ticker}: {} - {}", error.code, error.description);
        }

        let Some(result) = chart.result.and_then(|mut r| r.pop()) else {
            return Ok(Vec::new());
        };

        let timestamps = result.timestamp.unwrap_or_default();
        let closes = result
            .indicators
            .quote
            .into_iter()
            .next()
            .and_then(|q| q.close)
            .unwrap_or_default();

        let points = timestamps
            .into_iter()
            .zip(closes)
            .filter_map(|(ts, close)| {
                let date = Utc.timestamp_opt(ts, 0).single()?.date_naive();
                let close = Decimal::try_from(close?).ok()?;
                Some(DailyClose { date, close })
            })
            .collect();

        Ok(points)
    }
}
