//! Bandit State
//!
//! Beta-distribution belief parameters for one (regime, signal) pair.

use serde::{Deserialize, Serialize};

/// Beta(alpha, beta) belief about a signal's reliability within a regime.
///
/// Created lazily at the uniform prior (alpha = beta = 1) on first access
/// and only ever grown by reward updates; alpha + beta - 2 is the total
/// evidence accumulated beyond the prior.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RlState {
    pub regime_key: String,
    pub signal_name: String,
    pub alpha: f64,
    pub beta: f64,
}

impl RlState {
    /// Uniform prior for a never-seen (regime, signal) pair.
    pub fn prior(regime_key: impl Into<String>, signal_name: impl Into<String>) -> Self {
        Self {
            regime_key: regime_key.into(),
            signal_name: signal_name.into(),
            alpha: 1.0,
            beta: 1.0,
        }
    }

    /// Expected value of the Beta distribution.
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    /// Concentration-based reliability score, capped at 100 observations.
    pub fn reliability(&self) -> f64 {
        ((self.alpha + self.beta) / 100.0).min(1.0)
    }

    /// Evidence accumulated beyond the prior.
    pub fn observations(&self) -> f64 {
        self.alpha + self.beta - 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prior_is_uniform() {
        let state = RlState::prior("medium_stable_neutral", "inflation");
        assert_eq!(state.alpha, 1.0);
        assert_eq!(state.beta, 1.0);
        assert_eq!(state.mean(), 0.5);
        assert_eq!(state.observations(), 0.0);
    }

    #[test]
    fn test_reliability_caps_at_one() {
        let mut state = RlState::prior("k", "s");
        state.alpha = 80.0;
        state.beta = 40.0;
        assert_eq!(state.reliability(), 1.0);

        state.alpha = 30.0;
        state.beta = 20.0;
        assert_eq!(state.reliability(), 0.5);
    }
}
