//! Signal Observations
//!
//! Typed outputs of the external signal-gathering agents. Values are decoded
//! into a tagged union at the agent boundary so downstream consumers never
//! re-parse free text.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The payload of a signal, decoded once when the observation is built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SignalValue {
    /// Free-text finding (news summaries, qualitative assessments)
    Text(String),

    /// Numeric finding with units already stripped (e.g. an inflation
    /// percentage, a growth rate)
    Number(f64),

    /// Structured payload (e.g. price info blocks) kept as raw JSON
    Structured(serde_json::Value),

    /// The gathering agent could not produce a usable value
    Insufficient,
}

impl SignalValue {
    /// Lowercased text rendering used for keyword scanning.
    ///
    /// `Insufficient` renders to `None`; numbers render to their decimal
    /// form so a percentage pattern can still match text-adjacent callers.
    pub fn search_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.to_lowercase()),
            Self::Number(n) => Some(n.to_string()),
            Self::Structured(v) => Some(v.to_string().to_lowercase()),
            Self::Insufficient => None,
        }
    }

    /// Whether the gathering agent marked this signal unusable.
    pub fn is_insufficient(&self) -> bool {
        matches!(self, Self::Insufficient)
    }
}

/// A single named, confidence-scored observation produced by a gathering
/// agent for one decision cycle. Immutable once constructed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignalObservation {
    /// Unique signal id within the universe (e.g. "inflation", "current")
    pub name: String,

    /// Decoded payload
    pub value: SignalValue,

    /// Agent's confidence in the value (0.0 - 1.0)
    pub confidence: f64,

    /// Provenance, ordered by relevance
    pub sources: Vec<String>,

    /// Free-form notes carried alongside the value
    pub notes: Option<String>,
}

impl SignalObservation {
    pub fn new(name: impl Into<String>, value: SignalValue, confidence: f64) -> Self {
        Self {
            name: name.into(),
            value,
            confidence,
            sources: Vec::new(),
            notes: None,
        }
    }

    /// An observation standing in for a signal the agents never produced.
    pub fn insufficient(name: impl Into<String>) -> Self {
        Self::new(name, SignalValue::Insufficient, 0.0)
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    /// Value plus notes, lowercased, for sentiment keyword counting.
    pub fn combined_text(&self) -> Option<String> {
        let value_text = self.value.search_text()?;
        match &self.notes {
            Some(notes) => Some(format!("{} {}", value_text, notes.to_lowercase())),
            None => Some(value_text),
        }
    }
}

/// Input contract of the weighting engine for one decision cycle.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DecisionContext {
    /// Ticker under consideration
    pub symbol: String,

    /// Sector used for sector-specific weight overrides
    pub sector: Option<String>,

    /// Merged agent outputs, keyed by signal name
    pub signals: HashMap<String, SignalObservation>,

    /// Optional precomputed indicators (e.g. "volatility")
    pub technical_indicators: Option<HashMap<String, f64>>,
}

impl DecisionContext {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_signal(mut self, observation: SignalObservation) -> Self {
        self.signals.insert(observation.name.clone(), observation);
        self
    }

    pub fn with_indicator(mut self, name: impl Into<String>, value: f64) -> Self {
        self.technical_indicators
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_text_lowercases() {
        let value = SignalValue::Text("High Inflation at 6.5%".into());
        assert_eq!(value.search_text().unwrap(), "high inflation at 6.5%");
    }

    #[test]
    fn test_insufficient_has_no_text() {
        assert!(SignalValue::Insufficient.search_text().is_none());
        assert!(SignalValue::Insufficient.is_insufficient());
    }

    #[test]
    fn test_combined_text_includes_notes() {
        let obs = SignalObservation::new(
            "current",
            SignalValue::Text("Strong results".into()),
            0.8,
        )
        .with_notes("Bullish outlook");

        assert_eq!(obs.combined_text().unwrap(), "strong results bullish outlook");
    }

    #[test]
    fn test_context_builder() {
        let ctx = DecisionContext::new("HDFCBANK")
            .with_sector("banking")
            .with_indicator("volatility", 0.22);

        assert_eq!(ctx.symbol, "HDFCBANK");
        assert_eq!(ctx.sector.as_deref(), Some("banking"));
        assert_eq!(
            ctx.technical_indicators.unwrap().get("volatility"),
            Some(&0.22)
        );
    }
}
