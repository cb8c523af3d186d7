//! # advisor-core
//!
//! Domain model shared by the adaptive signal-weighting engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Decision Cycle                           │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │   Signal     │──▶│   Regime     │──▶│   Weight Plan    │  │
//! │  │ Observations │   │ Classifier   │   │ (expert ⊕ RL)    │  │
//! │  └──────────────┘   └──────────────┘   └──────────────────┘  │
//! │          │                  │                    │           │
//! │          └──────────────────┴────────────────────┘           │
//! │                             ▼                                │
//! │                      DecisionRecord                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Signal gathering and the LLM decision call live outside this workspace;
//! everything here is the typed substrate they exchange: observations,
//! regimes, bandit state, and decision records.

pub mod decision;
pub mod learning;
pub mod regime;
pub mod signal;

pub use decision::{Decision, DecisionRecord, ParseDecisionError, WeightConfiguration};
pub use learning::RlState;
pub use regime::{InflationLevel, MarketRegime, RateTrend, Sentiment};
pub use signal::{DecisionContext, SignalObservation, SignalValue};
