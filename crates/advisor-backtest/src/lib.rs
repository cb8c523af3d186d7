//! # advisor-backtest
//!
//! Offline evaluation of the weighting systems against historical index
//! prices. Replays sampled trading days, classifies the regime from a
//! trailing price window, asks the weight engine for each system's
//! distribution, makes a cheap rule-based decision, measures the 7-day
//! outcome, and (for the RL system) feeds the reward back into the bandit.
//!
//! The replay is strictly sequential so runs are reproducible; the decision
//! rule is intentionally simpler than the live LLM path; it only has to be
//! a consistent signal source for the learner.

pub mod driver;
pub mod error;
pub mod history;
pub mod indicators;
pub mod metrics;
pub mod settings;

pub use driver::{BacktestConfig, Backtester, SystemType};
pub use error::{BacktestError, Result};
pub use history::{PriceBar, PriceHistory};
pub use metrics::{calculate_metrics, comparison_table, SystemMetrics};
pub use settings::Settings;
