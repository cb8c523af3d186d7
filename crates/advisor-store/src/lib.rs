//! # advisor-store
//!
//! Persistence seam for the weighting engine: bandit state keyed by
//! (regime, signal) and the decision history awaiting outcome evaluation.
//!
//! Two implementations of [`StateStore`] are provided: an in-memory store
//! for tests and ephemeral runs, and a SQLite store (feature `sqlite`, on
//! by default) for durable learning across sessions.
//!
//! Bandit updates go through [`StateStore::bump_rl_state`], which applies
//! alpha/beta deltas atomically: concurrent updates to the same
//! (regime, signal) pair are serialized by the store, never read-modify-
//! written by callers.

pub mod error;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use error::{Result, StoreError};
pub use memory::MemoryStateStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStateStore;

use async_trait::async_trait;

use advisor_core::{DecisionRecord, RlState};

/// Persistence contract for bandit state and decision history.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetch the bandit state for one (regime, signal) pair.
    ///
    /// Returns `None` for never-seen pairs; callers treat that as the
    /// uniform prior.
    async fn rl_state(&self, regime_key: &str, signal_name: &str) -> Result<Option<RlState>>;

    /// All persisted bandit states for a regime.
    async fn rl_states_for_regime(&self, regime_key: &str) -> Result<Vec<RlState>>;

    /// Atomically add deltas to a pair's alpha/beta, creating the pair at
    /// the uniform prior if it does not exist. Returns the post-update
    /// state.
    async fn bump_rl_state(
        &self,
        regime_key: &str,
        signal_name: &str,
        alpha_delta: f64,
        beta_delta: f64,
    ) -> Result<RlState>;

    /// Persist a fresh (unevaluated) decision. Returns its assigned id.
    async fn record_decision(&self, record: &DecisionRecord) -> Result<i64>;

    /// Attach the realized outcome to a decision and mark it evaluated.
    async fn record_outcome(&self, decision_id: i64, outcome_7d: f64, reward: f64) -> Result<()>;

    /// Decisions still waiting for their outcome, oldest first.
    async fn unevaluated_decisions(&self) -> Result<Vec<DecisionRecord>>;

    /// All decisions made under a regime, newest first.
    async fn decisions_by_regime(&self, regime_key: &str) -> Result<Vec<DecisionRecord>>;
}
