//! Weight Engine
//!
//! Orchestrates the full pipeline (base weights, regime multipliers,
//! Thompson-sampled weights, blending, normalization) into the single
//! entry point consumed by decision-making and backtesting.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use advisor_core::{DecisionContext, MarketRegime, WeightConfiguration};

use crate::bandit::ThompsonSampler;
use crate::classifier::RegimeClassifier;
use crate::multipliers::apply_regime_multipliers;
use crate::registry::{base_weights, normalize_weights, ALL_SIGNALS};

/// Knobs for one weight computation.
#[derive(Clone, Copy, Debug)]
pub struct WeightOptions {
    /// Whether to blend in bandit-sampled weights
    pub use_rl: bool,

    /// How much to trust the learned weights over the expert prior
    pub blend_ratio: f64,
}

impl Default for WeightOptions {
    fn default() -> Self {
        Self {
            use_rl: true,
            blend_ratio: 0.7,
        }
    }
}

impl WeightOptions {
    /// Expert weights only; no learner involvement.
    pub fn expert_only() -> Self {
        Self {
            use_rl: false,
            blend_ratio: 0.0,
        }
    }
}

/// Which weight source actually produced the final distribution.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum WeightSource {
    /// Expert and learned weights blended at the given ratio
    Blended { ratio: f64 },

    /// Learner intentionally disabled for this computation
    ExpertOnly,

    /// Learner requested but unavailable; expert weights in force
    ExpertFallback { reason: String },
}

impl WeightSource {
    pub fn describe(&self) -> String {
        match self {
            Self::Blended { ratio } => format!("expert/RL blend (RL ratio {ratio:.2})"),
            Self::ExpertOnly => "expert weights (RL disabled)".to_string(),
            Self::ExpertFallback { reason } => {
                format!("expert weights (RL unavailable: {reason})")
            }
        }
    }
}

/// Result of one weight computation: the final distribution, the regime it
/// was conditioned on, per-signal explainability snapshots, and the source
/// that won.
#[derive(Clone, Debug, Serialize)]
pub struct WeightPlan {
    pub weights: HashMap<String, f64>,
    pub regime: MarketRegime,
    pub configs: HashMap<String, WeightConfiguration>,
    pub source: WeightSource,
}

impl WeightPlan {
    /// Human-readable rationale: regime, source, and the top-5 weights.
    pub fn summary(&self) -> String {
        let mut configs: Vec<_> = self.configs.values().collect();
        configs.sort_by(|a, b| {
            b.final_weight
                .partial_cmp(&a.final_weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut s = String::new();
        s.push_str(&self.regime.describe());
        s.push('\n');
        s.push_str(&format!("Weights: {}\n", self.source.describe()));
        for config in configs.iter().take(5) {
            s.push_str(&format!("  {}\n", config.explain()));
        }
        s
    }
}

/// Blend expert and learned weight maps linearly.
///
/// `ratio` is the trust placed in the learned weights; a signal missing from
/// the learned map falls back to its expert weight. With no learned map the
/// expert weights are returned unchanged, whatever the ratio.
pub fn blend_weights(
    expert_weights: &HashMap<String, f64>,
    rl_weights: Option<&HashMap<String, f64>>,
    rl_blend_ratio: f64,
) -> HashMap<String, f64> {
    let Some(rl_weights) = rl_weights else {
        return expert_weights.clone();
    };

    let mut blended = HashMap::with_capacity(ALL_SIGNALS.len());
    for signal in ALL_SIGNALS {
        let expert = expert_weights.get(signal).copied().unwrap_or(0.0);
        let learned = rl_weights.get(signal).copied().unwrap_or(expert);
        blended.insert(
            signal.to_string(),
            rl_blend_ratio * learned + (1.0 - rl_blend_ratio) * expert,
        );
    }

    tracing::info!("Blended weights with RL ratio {rl_blend_ratio:.2}");
    blended
}

/// The externally consumed entry point of the weighting core.
pub struct WeightEngine {
    learner: Option<Arc<ThompsonSampler>>,
    base: HashMap<String, f64>,
}

impl Default for WeightEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightEngine {
    /// Engine without a learner: expert weights only.
    pub fn new() -> Self {
        Self {
            learner: None,
            base: base_weights(),
        }
    }

    pub fn with_learner(learner: Arc<ThompsonSampler>) -> Self {
        Self {
            learner: Some(learner),
            base: base_weights(),
        }
    }

    /// The expert-assigned base distribution.
    pub fn base_weights(&self) -> HashMap<String, f64> {
        self.base.clone()
    }

    /// Classify the regime for a decision context.
    pub fn detect_regime(&self, ctx: &DecisionContext) -> MarketRegime {
        RegimeClassifier::detect(&ctx.signals, ctx.technical_indicators.as_ref())
    }

    /// Full pipeline from a decision context. Never fails: learner problems
    /// degrade to expert weights with a tagged source.
    pub async fn final_weights(&self, ctx: &DecisionContext, options: WeightOptions) -> WeightPlan {
        let regime = self.detect_regime(ctx);
        self.final_weights_for_regime(regime, ctx.sector.as_deref(), options)
            .await
    }

    /// Full pipeline for an already-classified regime (the backtest path).
    pub async fn final_weights_for_regime(
        &self,
        regime: MarketRegime,
        sector: Option<&str>,
        options: WeightOptions,
    ) -> WeightPlan {
        let expert_raw = apply_regime_multipliers(&self.base, &regime, sector);
        let expert = normalize_weights(&expert_raw);

        let (rl_weights, source) = if !options.use_rl {
            (None, WeightSource::ExpertOnly)
        } else {
            match &self.learner {
                None => {
                    tracing::warn!("RL weights requested but no learner is configured");
                    (
                        None,
                        WeightSource::ExpertFallback {
                            reason: "no learner configured".to_string(),
                        },
                    )
                }
                Some(learner) => match learner.select_weights(&regime).await {
                    Ok(weights) => (
                        Some(weights),
                        WeightSource::Blended {
                            ratio: options.blend_ratio,
                        },
                    ),
                    Err(e) => {
                        tracing::warn!("Failed to get RL weights: {e}");
                        (
                            None,
                            WeightSource::ExpertFallback {
                                reason: e.to_string(),
                            },
                        )
                    }
                },
            }
        };

        let blended = blend_weights(&expert, rl_weights.as_ref(), options.blend_ratio);
        let final_weights = normalize_weights(&blended);

        let mut configs = HashMap::with_capacity(ALL_SIGNALS.len());
        for signal in ALL_SIGNALS {
            let base_weight = self.base.get(signal).copied().unwrap_or(0.0);
            let expert_weight = expert.get(signal).copied().unwrap_or(0.0);
            configs.insert(
                signal.to_string(),
                WeightConfiguration {
                    signal_name: signal.to_string(),
                    base_weight,
                    multiplier: if base_weight > 0.0 {
                        expert_weight / base_weight
                    } else {
                        1.0
                    },
                    rl_weight: rl_weights
                        .as_ref()
                        .and_then(|weights| weights.get(signal).copied())
                        .unwrap_or(expert_weight),
                    final_weight: final_weights.get(signal).copied().unwrap_or(0.0),
                },
            );
        }

        tracing::info!(
            "Final weights computed for regime {}: {}",
            regime.key(),
            source.describe()
        );

        WeightPlan {
            weights: final_weights,
            regime,
            configs,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::{Decision, DecisionRecord, SignalObservation, SignalValue};
    use advisor_store::MemoryStateStore;

    fn context_with_signals() -> DecisionContext {
        DecisionContext::new("HDFCBANK")
            .with_sector("banking")
            .with_signal(SignalObservation::new(
                "inflation",
                SignalValue::Text("High inflation at 7%".into()),
                0.9,
            ))
            .with_signal(SignalObservation::new(
                "interest_rates",
                SignalValue::Text("Rates raised 50bps".into()),
                0.95,
            ))
            .with_signal(
                SignalObservation::new(
                    "current",
                    SignalValue::Text("Weak quarterly results".into()),
                    0.8,
                )
                .with_notes("negative outlook, decline in margins"),
            )
    }

    #[test]
    fn test_blend_identity_without_rl() {
        let expert = base_weights();
        for ratio in [0.0, 0.5, 1.0] {
            let blended = blend_weights(&expert, None, ratio);
            assert_eq!(blended, expert);
        }
    }

    #[test]
    fn test_blend_ratio_math() {
        let mut expert = HashMap::new();
        let mut learned = HashMap::new();
        for signal in ALL_SIGNALS {
            expert.insert(signal.to_string(), 0.2);
            learned.insert(signal.to_string(), 0.6);
        }

        let blended = blend_weights(&expert, Some(&learned), 0.7);
        // 0.7 * 0.6 + 0.3 * 0.2 = 0.48
        assert!((blended["current"] - 0.48).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_expert_plan_is_normalized_everywhere() {
        let engine = WeightEngine::new();

        for sector in [None, Some("banking"), Some("pharma"), Some("unknown")] {
            let mut ctx = context_with_signals();
            ctx.sector = sector.map(String::from);

            let plan = engine.final_weights(&ctx, WeightOptions::expert_only()).await;
            let total: f64 = plan.weights.values().sum();
            assert!((total - 1.0).abs() < 1e-6, "sector {sector:?}: {total}");
            assert!(plan.weights.values().all(|w| *w >= 0.0));
            assert_eq!(plan.weights.len(), 15);
            assert_eq!(plan.source, WeightSource::ExpertOnly);
        }
    }

    #[tokio::test]
    async fn test_regime_conditioning_from_signals() {
        let engine = WeightEngine::new();
        let plan = engine
            .final_weights(&context_with_signals(), WeightOptions::expert_only())
            .await;

        assert_eq!(plan.regime.key(), "high_rising_bearish");
        // High inflation + rising rates push macro above its base share
        assert!(plan.weights["inflation"] > 0.10);
        // Sector override amplifies rates for banking on top of the regime
        assert!(plan.weights["interest_rates"] > plan.weights["inflation"]);
    }

    #[tokio::test]
    async fn test_missing_learner_falls_back_observably() {
        let engine = WeightEngine::new();
        let plan = engine
            .final_weights(&context_with_signals(), WeightOptions::default())
            .await;

        assert!(matches!(plan.source, WeightSource::ExpertFallback { .. }));
        let total: f64 = plan.weights.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(plan.summary().contains("RL unavailable"));
    }

    #[tokio::test]
    async fn test_blended_plan_with_learner() {
        let store = Arc::new(MemoryStateStore::new());
        let learner = Arc::new(ThompsonSampler::with_seed(store, 11));
        let engine = WeightEngine::with_learner(learner);

        let plan = engine
            .final_weights(&context_with_signals(), WeightOptions::default())
            .await;

        assert_eq!(plan.source, WeightSource::Blended { ratio: 0.7 });
        let total: f64 = plan.weights.values().sum();
        assert!((total - 1.0).abs() < 1e-6);

        // Configs expose the full derivation per signal
        let config = &plan.configs["inflation"];
        assert!((config.base_weight - 0.10).abs() < 1e-9);
        assert!(config.multiplier > 0.0);
        assert!(config.final_weight > 0.0);
    }

    #[tokio::test]
    async fn test_shared_learning_bucket_across_symbols() {
        let store = Arc::new(MemoryStateStore::new());
        let learner = Arc::new(ThompsonSampler::with_seed(store.clone(), 21));
        let engine = WeightEngine::with_learner(learner.clone());

        // Symbol A decides in high_rising_bearish and its outcome is learned
        let plan_a = engine
            .final_weights(&context_with_signals(), WeightOptions::default())
            .await;
        assert_eq!(plan_a.regime.key(), "high_rising_bearish");

        let mut weights = HashMap::new();
        weights.insert("current".to_string(), 1.0);
        let record = DecisionRecord::new(
            "SYMBOL_A",
            Decision::Buy,
            0.9,
            weights,
            plan_a.regime.key(),
        );
        for _ in 0..20 {
            learner.update(&record, 1.7).await.unwrap();
        }

        // Symbol B in the same categorical regime (different volatility and
        // sector) reads the same bucket and sees the shifted belief
        let mut ctx_b = context_with_signals();
        ctx_b.symbol = "SYMBOL_B".into();
        ctx_b.sector = Some("it".into());
        ctx_b = ctx_b.with_indicator("volatility", 0.40);

        let plan_b = engine.final_weights(&ctx_b, WeightOptions::default()).await;
        assert_eq!(plan_b.regime.key(), "high_rising_bearish");

        let stats = learner.statistics(&plan_b.regime).await.unwrap();
        assert!((stats["current"].alpha - 21.0).abs() < 1e-9);

        // Averaged over repeated plans, the favored signal's sampled weight
        // clearly exceeds an untouched peer's
        let mut favored = 0.0;
        let mut baseline = 0.0;
        for _ in 0..100 {
            let plan = engine.final_weights(&ctx_b, WeightOptions::default()).await;
            favored += plan.configs["current"].rl_weight;
            baseline += plan.configs["agm"].rl_weight;
        }
        assert!(
            favored > baseline * 1.5,
            "favored={favored:.3}, baseline={baseline:.3}"
        );
    }
}
