//! Signal-fusion configuration.

use serde::{Deserialize, Serialize};

use super::signals::FusionMethod;

/// Configuration for fusing disclosures into signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// How conflicting disclosures are resolved into one signal
    pub method: FusionMethod,

    /// How far one side must outweigh the other before a dollar-weighted
    /// signal fires (1.5 = buys must exceed 1.5x sells)
    pub buy_threshold_multiplier: f64,

    /// Default lookback window for signal generation, in days
    pub lookback_days: u32,

    /// Minimum confidence for a signal to be considered actionable
    pub min_confidence: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            method: FusionMethod::DollarWeighted,
            buy_threshold_multiplier: 1.5,
            lookback_days: 30,
            min_confidence: 0.6,
        }
    }
}
