//! Response types for the daily-close chart API.

use serde::Deserialize;

/// Top-level envelope from the /v8/finance/chart endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartEnvelope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartEnvelope {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

/// Error payload returned for unknown tickers or bad ranges.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

/// One ticker's chart data: parallel timestamp and quote arrays.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartResult {
    /// Trading-day timestamps in epoch seconds
    #[serde(default)]
    pub timestamp: Option<Vec<i64>>,
    pub indicators: ChartIndicators,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<ChartQuote>,
}

/// Per-day quote arrays; entries are null on halted days.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartQuote {
    #[serde(default)]
    pub close: Option<Vec<Option<f64>>>,
}
