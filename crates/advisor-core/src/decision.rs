//! Decision Records
//!
//! Typed decisions, per-signal weight snapshots, and the persisted record of
//! one decision cycle awaiting its 7-day outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::signal::SignalObservation;

/// Recommendation emitted for a symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Buy,
    Hold,
    Sell,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Hold => "HOLD",
            Self::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error)]
#[error("unknown decision label: {0}")]
pub struct ParseDecisionError(pub String);

impl FromStr for Decision {
    type Err = ParseDecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Self::Buy),
            "HOLD" => Ok(Self::Hold),
            "SELL" => Ok(Self::Sell),
            other => Err(ParseDecisionError(other.to_string())),
        }
    }
}

/// Explainability snapshot of how one signal's final weight was assembled.
///
/// Computed fresh per decision; never persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeightConfiguration {
    pub signal_name: String,

    /// Expert-assigned base weight
    pub base_weight: f64,

    /// Effective regime multiplier (normalized expert weight / base weight)
    pub multiplier: f64,

    /// Weight sampled by the bandit learner (expert weight when RL is off)
    pub rl_weight: f64,

    /// Final blended, normalized weight
    pub final_weight: f64,
}

impl WeightConfiguration {
    /// One-line rationale for this signal's weight.
    pub fn explain(&self) -> String {
        format!(
            "{}: base={:.3}, regime_mult={:.2}, rl={:.3}, final={:.3}",
            self.signal_name, self.base_weight, self.multiplier, self.rl_weight, self.final_weight
        )
    }
}

/// Persisted record of one decision and, once known, its realized outcome.
///
/// Created with `evaluated = false`; mutated exactly once when the 7-day
/// outcome and reward land.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Store-assigned row id (None until recorded)
    pub id: Option<i64>,

    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub sector: Option<String>,
    pub decision: Decision,
    pub confidence: f64,

    /// Final weights in force when the decision was made
    pub weights_used: HashMap<String, f64>,

    /// Regime key (categorical components only)
    pub market_regime: String,

    /// Agent outputs the decision saw
    pub agent_outputs: HashMap<String, SignalObservation>,

    /// Realized return percentage after 7 trading days
    pub outcome_7d: Option<f64>,

    /// Reward computed from the outcome
    pub reward: Option<f64>,

    pub evaluated: bool,

    /// Originating conversation, when the decision came from a chat turn
    pub conversation_id: Option<Uuid>,
    pub turn_number: Option<u32>,
}

impl DecisionRecord {
    pub fn new(
        symbol: impl Into<String>,
        decision: Decision,
        confidence: f64,
        weights_used: HashMap<String, f64>,
        market_regime: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            symbol: symbol.into(),
            sector: None,
            decision,
            confidence,
            weights_used,
            market_regime: market_regime.into(),
            agent_outputs: HashMap::new(),
            outcome_7d: None,
            reward: None,
            evaluated: false,
            conversation_id: None,
            turn_number: None,
        }
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_agent_outputs(mut self, outputs: HashMap<String, SignalObservation>) -> Self {
        self.agent_outputs = outputs;
        self
    }

    /// Attach the realized outcome. Flips `evaluated`; intended to be called
    /// exactly once per record.
    pub fn record_outcome(&mut self, outcome_7d: f64, reward: f64) {
        self.outcome_7d = Some(outcome_7d);
        self.reward = Some(reward);
        self.evaluated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_round_trip() {
        for decision in [Decision::Buy, Decision::Hold, Decision::Sell] {
            let parsed: Decision = decision.as_str().parse().unwrap();
            assert_eq!(parsed, decision);
        }
    }

    #[test]
    fn test_unknown_label_rejected() {
        assert!("SHORT".parse::<Decision>().is_err());
        assert!("buy".parse::<Decision>().is_err());
    }

    #[test]
    fn test_record_outcome_flips_evaluated() {
        let mut record = DecisionRecord::new(
            "NIFTY50",
            Decision::Buy,
            0.8,
            HashMap::new(),
            "high_rising_bearish",
        );
        assert!(!record.evaluated);

        record.record_outcome(2.4, 1.1);
        assert!(record.evaluated);
        assert_eq!(record.outcome_7d, Some(2.4));
        assert_eq!(record.reward, Some(1.1));
    }

    #[test]
    fn test_weight_configuration_explain() {
        let config = WeightConfiguration {
            signal_name: "inflation".into(),
            base_weight: 0.10,
            multiplier: 1.25,
            rl_weight: 0.14,
            final_weight: 0.13,
        };
        assert_eq!(
            config.explain(),
            "inflation: base=0.100, regime_mult=1.25, rl=0.140, final=0.130"
        );
    }
}
