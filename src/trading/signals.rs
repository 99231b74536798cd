//! Signal fusion: turn one ticker's recent disclosures into a single
//! directional signal with a confidence score.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{DisclosedTrade, SignalDirection, TradeSignal};

use super::FusionConfig;

/// How multiple same-ticker disclosures are resolved into one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    /// Weigh each side by total estimated dollars
    DollarWeighted,
    /// Signal only when every disclosure agrees
    UnanimousOnly,
    /// Weigh by each politician's historical accuracy
    TrackRecord,
}

impl FusionMethod {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "unanimous" | "unanimous_only" => Self::UnanimousOnly,
            "track_record" | "track-record" => Self::TrackRecord,
            _ => Self::DollarWeighted,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DollarWeighted => "dollar_weighted",
            Self::UnanimousOnly => "unanimous_only",
            Self::TrackRecord => "track_record",
        }
    }
}

/// Read access to stored disclosures, as needed for signal generation.
#[async_trait]
pub trait DisclosureStore: Send + Sync {
    /// Disclosures for one ticker whose disclosure date falls inside the
    /// lookback window.
    async fn trades_for_ticker(
        &self,
        ticker: &str,
        lookback_days: u32,
    ) -> Result<Vec<DisclosedTrade>>;

    /// Distinct tickers with any disclosure inside the lookback window.
    async fn recent_tickers(&self, lookback_days: u32) -> Result<Vec<String>>;
}

/// Sink recording produced signals for later accuracy comparison.
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn record_signal(
        &self,
        ticker: &str,
        direction: SignalDirection,
        confidence: f64,
        method: FusionMethod,
    ) -> Result<()>;
}

/// Generates trading signals from stored disclosures.
pub struct SignalGenerator {
    config: FusionConfig,
    store: Arc<dyn DisclosureStore>,
    sink: Option<Arc<dyn SignalSink>>,
}

impl SignalGenerator {
    pub fn new(
        config: FusionConfig,
        store: Arc<dyn DisclosureStore>,
        sink: Option<Arc<dyn SignalSink>>,
    ) -> Self {
        Self { config, store, sink }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Analyze one ticker's recent disclosures and produce a signal.
    pub async fn analyze_ticker(&self, ticker: &str, lookback_days: u32) -> Result<TradeSignal> {
        let trades = self.store.trades_for_ticker(ticker, lookback_days).await?;

        if trades.is_empty() {
            return Ok(TradeSignal::hold(
                ticker,
                Vec::new(),
                "No recent congressional disclosures found",
            ));
        }

        let (buys, rest): (Vec<DisclosedTrade>, Vec<DisclosedTrade>) =
            trades.into_iter().partition(|t| t.kind.is_purchase());
        let sells: Vec<DisclosedTrade> = rest.into_iter().filter(|t| t.kind.is_sale()).collect();

        let signal = self.fuse(ticker, buys, sells);

        // Side channel only; a sink failure must never fail the signal
        if signal.direction.is_actionable() {
            if let Some(sink) = &self.sink {
                if let Err(e) = sink
                    .record_signal(ticker, signal.direction, signal.confidence, self.config.method)
                    .await
                {
                    debug!(ticker = %ticker, error = %e, "Could not record signal");
                }
            }
        }

        Ok(signal)
    }

    /// Actionable signals for every ticker with recent activity, sorted by
    /// confidence descending.
    pub async fn recent_signals(
        &self,
        lookback_days: u32,
        min_confidence: Option<f64>,
    ) -> Result<Vec<TradeSignal>> {
        let min_confidence = min_confidence.unwrap_or(self.config.min_confidence);
        let tickers = self.store.recent_tickers(lookback_days).await?;

        let mut signals = Vec::new();
        for ticker in &tickers {
            let signal = self.analyze_ticker(ticker, lookback_days).await?;
            if signal.direction.is_actionable() && signal.confidence >= min_confidence {
                signals.push(signal);
            }
        }

        signals.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            actionable = signals.len(),
            tickers = tickers.len(),
            "Generated signals"
        );

        Ok(signals)
    }

    /// Top N recommendations by confidence.
    pub async fn top_recommendations(
        &self,
        count: usize,
        lookback_days: u32,
    ) -> Result<Vec<TradeSignal>> {
        let mut signals = self.recent_signals(lookback_days, None).await?;
        signals.truncate(count);
        Ok(signals)
    }

    fn fuse(&self, ticker: &str, buys: Vec<DisclosedTrade>, sells: Vec<DisclosedTrade>) -> TradeSignal {
        match self.config.method {
            FusionMethod::DollarWeighted => self.dollar_weighted(ticker, buys, sells),
            FusionMethod::UnanimousOnly => self.unanimous_only(ticker, buys, sells),
            FusionMethod::TrackRecord => self.by_track_record(ticker, buys, sells),
        }
    }

    /// Weigh buys against sells by total estimated dollars.
    fn dollar_weighted(
        &self,
        ticker: &str,
        buys: Vec<DisclosedTrade>,
        sells: Vec<DisclosedTrade>,
    ) -> TradeSignal {
        let buy_weight: Decimal = buys.iter().filter_map(|t| t.estimated_amount).sum();
        let sell_weight: Decimal = sells.iter().filter_map(|t| t.estimated_amount).sum();
        let total_weight = buy_weight + sell_weight;

        if total_weight.is_zero() {
            let mut all = buys;
            all.extend(sells);
            return TradeSignal::hold(ticker, all, "No valid trade amounts found");
        }

        let multiplier =
            Decimal::try_from(self.config.buy_threshold_multiplier).unwrap_or(Decimal::ONE);

        if buy_weight > sell_weight * multiplier {
            let confidence = (buy_weight / total_weight).to_f64().unwrap_or(0.0).min(1.0);
            TradeSignal {
                ticker: ticker.to_string(),
                direction: SignalDirection::Buy,
                confidence,
                reason: format!(
                    "Buy trades (${buy_weight:.0}) outweigh sells (${sell_weight:.0})"
                ),
                supporting_trades: buys,
                conflicting_trades: sells,
            }
        } else if sell_weight > buy_weight * multiplier {
            let confidence = (sell_weight / total_weight).to_f64().unwrap_or(0.0).min(1.0);
            TradeSignal {
                ticker: ticker.to_string(),
                direction: SignalDirection::Sell,
                confidence,
                reason: format!(
                    "Sell trades (${sell_weight:.0}) outweigh buys (${buy_weight:.0})"
                ),
                supporting_trades: sells,
                conflicting_trades: buys,
            }
        } else {
            // Ties and near-ties stay conservative
            let mut all = buys;
            all.extend(sells);
            TradeSignal::hold(
                ticker,
                all,
                format!("Conflicting signals: buys ${buy_weight:.0}, sells ${sell_weight:.0}"),
            )
        }
    }

    /// Signal only when every disclosure points the same way.
    fn unanimous_only(
        &self,
        ticker: &str,
        buys: Vec<DisclosedTrade>,
        sells: Vec<DisclosedTrade>,
    ) -> TradeSignal {
        if !buys.is_empty() && sells.is_empty() {
            // More agreeing filers, higher confidence; capped at 10 trades
            let confidence = (buys.len() as f64 / 10.0).min(1.0);
            let reason = format!("Unanimous buy signal from {} trades", buys.len());
            TradeSignal {
                ticker: ticker.to_string(),
                direction: SignalDirection::Buy,
                confidence,
                supporting_trades: buys,
                conflicting_trades: Vec::new(),
                reason,
            }
        } else if !sells.is_empty() && buys.is_empty() {
            let confidence = (sells.len() as f64 / 10.0).min(1.0);
            let reason = format!("Unanimous sell signal from {} trades", sells.len());
            TradeSignal {
                ticker: ticker.to_string(),
                direction: SignalDirection::Sell,
                confidence,
                supporting_trades: sells,
                conflicting_trades: Vec::new(),
                reason,
            }
        } else {
            let reason = format!("Mixed signals: {} buys, {} sells", buys.len(), sells.len());
            let mut all = buys;
            all.extend(sells);
            TradeSignal::hold(ticker, all, reason)
        }
    }

    /// Weight disclosures by each politician's historical accuracy.
    ///
    /// Accuracy history accumulates in the signal sink over time; until
    /// enough of it exists this method is defined to fall back to the
    /// dollar-weighted resolution.
    fn by_track_record(
        &self,
        ticker: &str,
        buys: Vec<DisclosedTrade>,
        sells: Vec<DisclosedTrade>,
    ) -> TradeSignal {
        warn!("Track-record weighting has no accuracy history yet, using dollar-weighted");
        self.dollar_weighted(ticker, buys, sells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    struct EmptyStore;

    #[async_trait]
    impl DisclosureStore for EmptyStore {
        async fn trades_for_ticker(
            &self,
            _ticker: &str,
            _lookback_days: u32,
        ) -> Result<Vec<DisclosedTrade>> {
            Ok(Vec::new())
        }

        async fn recent_tickers(&self, _lookback_days: u32) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn generator(method: FusionMethod) -> SignalGenerator {
        let config = FusionConfig {
            method,
            ..Default::default()
        };
        SignalGenerator::new(config, Arc::new(EmptyStore), None)
    }

    fn make_trade(kind: TransactionKind, amount: Decimal) -> DisclosedTrade {
        DisclosedTrade {
            politician: "Jane Doe".to_string(),
            party: Some("D".to_string()),
            ticker: "AAPL".to_string(),
            kind,
            transaction_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            disclosure_date: NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
            amount_range: String::new(),
            estimated_amount: Some(amount),
        }
    }

    fn buys(amounts: &[Decimal]) -> Vec<DisclosedTrade> {
        amounts
            .iter()
            .map(|a| make_trade(TransactionKind::Purchase, *a))
            .collect()
    }

    fn sells(amounts: &[Decimal]) -> Vec<DisclosedTrade> {
        amounts
            .iter()
            .map(|a| make_trade(TransactionKind::Sale, *a))
            .collect()
    }

    #[test]
    fn test_dollar_weighted_buy_signal() {
        let sig = generator(FusionMethod::DollarWeighted);
        let signal = sig.dollar_weighted("AAPL", buys(&[dec!(100000)]), sells(&[dec!(10000)]));

        assert_eq!(signal.direction, SignalDirection::Buy);
        // 100000 / 110000
        assert!((signal.confidence - 0.9090909).abs() < 1e-6);
        assert_eq!(signal.supporting_trades.len(), 1);
        assert_eq!(signal.conflicting_trades.len(), 1);
    }

    #[test]
    fn test_dollar_weighted_sell_signal() {
        let sig = generator(FusionMethod::DollarWeighted);
        let signal = sig.dollar_weighted("AAPL", buys(&[dec!(10000)]), sells(&[dec!(100000)]));

        assert_eq!(signal.direction, SignalDirection::Sell);
        assert!((signal.confidence - 0.9090909).abs() < 1e-6);
    }

    #[test]
    fn test_dollar_weighted_near_tie_holds() {
        // 60k vs 50k: neither side clears the 1.5x multiplier
        let sig = generator(FusionMethod::DollarWeighted);
        let signal = sig.dollar_weighted("AAPL", buys(&[dec!(60000)]), sells(&[dec!(50000)]));

        assert_eq!(signal.direction, SignalDirection::Hold);
        assert_eq!(signal.confidence, 0.0);
        assert_eq!(signal.conflicting_trades.len(), 2);
    }

    #[test]
    fn test_dollar_weighted_zero_amounts_hold() {
        let sig = generator(FusionMethod::DollarWeighted);
        let mut one_buy = buys(&[dec!(0)]);
        one_buy[0].estimated_amount = None;

        let signal = sig.dollar_weighted("AAPL", one_buy, Vec::new());
        assert_eq!(signal.direction, SignalDirection::Hold);
        assert!(signal.reason.contains("No valid trade amounts"));
    }

    #[test]
    fn test_unanimous_confidence_scales_with_count() {
        let sig = generator(FusionMethod::UnanimousOnly);

        let three = sig.unanimous_only("AAPL", buys(&[dec!(1); 3]), Vec::new());
        assert_eq!(three.direction, SignalDirection::Buy);
        assert!((three.confidence - 0.3).abs() < 1e-12);

        let twelve = sig.unanimous_only("AAPL", buys(&[dec!(1); 12]), Vec::new());
        assert_eq!(twelve.confidence, 1.0);
    }

    #[test]
    fn test_unanimous_mixed_holds() {
        let sig = generator(FusionMethod::UnanimousOnly);
        let signal = sig.unanimous_only("AAPL", buys(&[dec!(1)]), sells(&[dec!(1)]));

        assert_eq!(signal.direction, SignalDirection::Hold);
        assert!(signal.reason.contains("Mixed signals"));
    }

    #[test]
    fn test_track_record_falls_back_to_dollar_weighted() {
        let sig = generator(FusionMethod::TrackRecord);
        let signal = sig.by_track_record("AAPL", buys(&[dec!(100000)]), sells(&[dec!(10000)]));

        assert_eq!(signal.direction, SignalDirection::Buy);
        assert!((signal.confidence - 0.9090909).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_analyze_ticker_without_disclosures_holds() {
        let sig = generator(FusionMethod::DollarWeighted);
        let signal = sig.analyze_ticker("AAPL", 30).await.unwrap();

        assert_eq!(signal.direction, SignalDirection::Hold);
        assert_eq!(signal.confidence, 0.0);
    }

    #[test]
    fn test_fusion_method_from_str() {
        assert_eq!(FusionMethod::from_str("unanimous_only"), FusionMethod::UnanimousOnly);
        assert_eq!(FusionMethod::from_str("track_record"), FusionMethod::TrackRecord);
        assert_eq!(FusionMethod::from_str("anything"), FusionMethod::DollarWeighted);
    }
}
