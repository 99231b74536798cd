//! Trading logic: trade-selection strategies, signal fusion, risk control.

mod config;
mod risk;
mod signals;
mod strategy;

pub use config::FusionConfig;
pub use risk::{ExitDecision, RiskConfig, RiskManager, TradeValidation};
pub use signals::{DisclosureStore, FusionMethod, SignalGenerator, SignalSink};
pub use strategy::{policy_by_name, FollowAll, LargeTrades, StrategyPolicy, TopPerformers};
