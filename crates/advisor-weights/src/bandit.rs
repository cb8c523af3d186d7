//! Bandit Learner
//!
//! Thompson Sampling over per-(regime, signal) Beta beliefs. Sampling draws
//! one value per signal from its posterior: uncertain signals occasionally
//! sample high (exploration), reliably good signals sample high consistently
//! (exploitation).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Beta, Distribution};
use serde::Serialize;

use advisor_core::{DecisionRecord, MarketRegime, RlState};
use advisor_store::StateStore;

use crate::error::{Result, WeightError};
use crate::registry::{normalize_weights, ALL_SIGNALS};

/// Reward range the update step rescales from; see `calculate_reward`.
const REWARD_MIN: f64 = -0.8;
const REWARD_SPAN: f64 = 2.5;

/// Read-only learning statistics for one signal within a regime.
#[derive(Clone, Debug, Serialize)]
pub struct SignalStats {
    pub alpha: f64,
    pub beta: f64,
    pub mean_weight: f64,
    pub reliability: f64,
    pub total_observations: f64,
}

/// Thompson Sampling learner for per-signal trust, conditioned on regime.
///
/// States are created lazily at the uniform prior and persisted through the
/// store's atomic bump; an in-memory cache mirrors the store to avoid
/// redundant reads within a session and is refreshed from every write.
pub struct ThompsonSampler {
    store: Arc<dyn StateStore>,
    cache: RwLock<HashMap<(String, String), (f64, f64)>>,
    rng: Mutex<StdRng>,
}

impl ThompsonSampler {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seeded construction for reproducible sampling.
    pub fn with_seed(store: Arc<dyn StateStore>, seed: u64) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Load one pair's state: cache, then store, then the uniform prior.
    async fn load_state(&self, regime_key: &str, signal_name: &str) -> Result<RlState> {
        let cache_key = (regime_key.to_string(), signal_name.to_string());

        if let Some(&(alpha, beta)) = self.cache.read().unwrap().get(&cache_key) {
            return Ok(RlState {
                regime_key: regime_key.to_string(),
                signal_name: signal_name.to_string(),
                alpha,
                beta,
            });
        }

        let state = self
            .store
            .rl_state(regime_key, signal_name)
            .await?
            .unwrap_or_else(|| RlState::prior(regime_key, signal_name));

        self.cache
            .write()
            .unwrap()
            .insert(cache_key, (state.alpha, state.beta));
        Ok(state)
    }

    fn refresh_cache(&self, state: &RlState) {
        self.cache.write().unwrap().insert(
            (state.regime_key.clone(), state.signal_name.clone()),
            (state.alpha, state.beta),
        );
    }

    /// Sample a weight per universe signal from its Beta posterior, then
    /// normalize the draws to a distribution summing to 1.
    pub async fn select_weights(&self, regime: &MarketRegime) -> Result<HashMap<String, f64>> {
        let regime_key = regime.key();
        let mut sampled = HashMap::with_capacity(ALL_SIGNALS.len());

        for signal in ALL_SIGNALS {
            let state = self.load_state(&regime_key, signal).await?;
            let distribution = Beta::new(state.alpha, state.beta)
                .map_err(|e| WeightError::Sampling(e.to_string()))?;
            let sample = distribution.sample(&mut *self.rng.lock().unwrap());
            sampled.insert(signal.to_string(), sample);
        }

        let normalized = normalize_weights(&sampled);

        if tracing::enabled!(tracing::Level::DEBUG) {
            let mut top: Vec<_> = normalized.iter().collect();
            top.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
            tracing::debug!(
                "Sampled weights for {regime_key}, top 3: {:?}",
                &top[..3.min(top.len())]
            );
        }

        Ok(normalized)
    }

    /// Update beliefs from a realized outcome.
    ///
    /// The reward is rescaled to [0, 1]; each signal present in the
    /// decision's weights receives credit (alpha) or blame (beta)
    /// proportional to its weight in that decision. Weight-proportional
    /// attribution conflates "was trusted" with "caused the outcome"; a
    /// deliberate tractability tradeoff, not a causal claim.
    pub async fn update(&self, decision_record: &DecisionRecord, reward: f64) -> Result<()> {
        let regime_key = &decision_record.market_regime;

        let normalized_reward = ((reward - REWARD_MIN) / REWARD_SPAN).clamp(0.0, 1.0);

        tracing::info!(
            "Updating RL states for {regime_key}, reward={reward:.3}, normalized={normalized_reward:.3}"
        );

        let mut updated = 0usize;
        for signal in ALL_SIGNALS {
            let Some(&weight_contribution) = decision_record.weights_used.get(signal) else {
                continue;
            };

            let (alpha_delta, beta_delta) = if normalized_reward > 0.5 {
                (weight_contribution * (normalized_reward - 0.5) * 2.0, 0.0)
            } else {
                (0.0, weight_contribution * (0.5 - normalized_reward) * 2.0)
            };

            let state = self
                .store
                .bump_rl_state(regime_key, signal, alpha_delta, beta_delta)
                .await?;
            self.refresh_cache(&state);
            updated += 1;
        }

        tracing::info!("Updated {updated} signal states for {regime_key}");
        Ok(())
    }

    /// Read-only learning statistics for every universe signal in a regime.
    pub async fn statistics(&self, regime: &MarketRegime) -> Result<HashMap<String, SignalStats>> {
        let regime_key = regime.key();
        let mut stats = HashMap::with_capacity(ALL_SIGNALS.len());

        for signal in ALL_SIGNALS {
            let state = self.load_state(&regime_key, signal).await?;
            stats.insert(
                signal.to_string(),
                SignalStats {
                    alpha: state.alpha,
                    beta: state.beta,
                    mean_weight: state.mean(),
                    reliability: state.reliability(),
                    total_observations: state.observations(),
                },
            );
        }

        Ok(stats)
    }
}
