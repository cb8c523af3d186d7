//! In-Memory State Store
//!
//! For tests and ephemeral runs. Bandit bumps happen entirely under one
//! write lock, so concurrent updates to the same pair are serialized.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use advisor_core::{DecisionRecord, RlState};

use crate::error::{Result, StoreError};
use crate::StateStore;

/// In-memory implementation of [`StateStore`].
#[derive(Default)]
pub struct MemoryStateStore {
    rl_states: RwLock<HashMap<(String, String), (f64, f64)>>,
    decisions: RwLock<Vec<DecisionRecord>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct (regime, signal) pairs with persisted state.
    pub fn rl_state_count(&self) -> usize {
        self.rl_states.read().unwrap().len()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn rl_state(&self, regime_key: &str, signal_name: &str) -> Result<Option<RlState>> {
        let states = self.rl_states.read().unwrap();
        Ok(states
            .get(&(regime_key.to_string(), signal_name.to_string()))
            .map(|&(alpha, beta)| RlState {
                regime_key: regime_key.to_string(),
                signal_name: signal_name.to_string(),
                alpha,
                beta,
            }))
    }

    async fn rl_states_for_regime(&self, regime_key: &str) -> Result<Vec<RlState>> {
        let states = self.rl_states.read().unwrap();
        Ok(states
            .iter()
            .filter(|((regime, _), _)| regime == regime_key)
            .map(|((regime, signal), &(alpha, beta))| RlState {
                regime_key: regime.clone(),
                signal_name: signal.clone(),
                alpha,
                beta,
            })
            .collect())
    }

    async fn bump_rl_state(
        &self,
        regime_key: &str,
        signal_name: &str,
        alpha_delta: f64,
        beta_delta: f64,
    ) -> Result<RlState> {
        let mut states = self.rl_states.write().unwrap();
        let entry = states
            .entry((regime_key.to_string(), signal_name.to_string()))
            .or_insert((1.0, 1.0));
        entry.0 += alpha_delta;
        entry.1 += beta_delta;

        Ok(RlState {
            regime_key: regime_key.to_string(),
            signal_name: signal_name.to_string(),
            alpha: entry.0,
            beta: entry.1,
        })
    }

    async fn record_decision(&self, record: &DecisionRecord) -> Result<i64> {
        let mut decisions = self.decisions.write().unwrap();
        let id = decisions.len() as i64 + 1;
        let mut stored = record.clone();
        stored.id = Some(id);
        decisions.push(stored);
        Ok(id)
    }

    async fn record_outcome(&self, decision_id: i64, outcome_7d: f64, reward: f64) -> Result<()> {
        let mut decisions = self.decisions.write().unwrap();
        let record = decisions
            .iter_mut()
            .find(|r| r.id == Some(decision_id))
            .ok_or(StoreError::DecisionNotFound(decision_id))?;
        record.record_outcome(outcome_7d, reward);
        Ok(())
    }

    async fn unevaluated_decisions(&self) -> Result<Vec<DecisionRecord>> {
        let decisions = self.decisions.read().unwrap();
        let mut pending: Vec<_> = decisions.iter().filter(|r| !r.evaluated).cloned().collect();
        pending.sort_by_key(|r| r.timestamp);
        Ok(pending)
    }

    async fn decisions_by_regime(&self, regime_key: &str) -> Result<Vec<DecisionRecord>> {
        let decisions = self.decisions.read().unwrap();
        let mut matching: Vec<_> = decisions
            .iter()
            .filter(|r| r.market_regime == regime_key)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(matching)
    }
}
