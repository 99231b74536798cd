//! Trading signal fused from one ticker's recent disclosures.

use serde::{Deserialize, Serialize};

use super::disclosure::DisclosedTrade;

/// Direction of a fused signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalDirection {
    Buy,
    Sell,
    Hold,
}

impl SignalDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalDirection::Buy => "BUY",
            SignalDirection::Sell => "SELL",
            SignalDirection::Hold => "HOLD",
        }
    }

    pub fn is_actionable(&self) -> bool {
        !matches!(self, SignalDirection::Hold)
    }
}

/// A directional signal for one ticker with its supporting evidence.
///
/// Confidence is only meaningful relative to the fusion method that produced
/// the signal; values from different methods are not comparable without
/// renormalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSignal {
    /// Stock ticker symbol
    pub ticker: String,

    /// Fused direction
    pub direction: SignalDirection,

    /// Confidence score (0.0 to 1.0)
    pub confidence: f64,

    /// Disclosures agreeing with the signal direction
    pub supporting_trades: Vec<DisclosedTrade>,

    /// Disclosures opposing the signal direction
    pub conflicting_trades: Vec<DisclosedTrade>,

    /// Human-readable explanation of the decision
    pub reason: String,
}

impl TradeSignal {
    /// A zero-confidence HOLD with the given explanation.
    pub fn hold(ticker: &str, conflicting: Vec<DisclosedTrade>, reason: impl Into<String>) -> Self {
        Self {
            ticker: ticker.to_string(),
            direction: SignalDirection::Hold,
            confidence: 0.0,
            supporting_trades: Vec::new(),
            conflicting_trades: conflicting,
            reason: reason.into(),
        }
    }
}
