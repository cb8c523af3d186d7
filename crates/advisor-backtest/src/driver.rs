//! Backtest Driver
//!
//! Sequentially replays sampled historical dates through regime
//! classification, weight selection, a rule-based decision, and outcome
//! measurement, feeding realized rewards back into the bandit when the RL
//! system is under test.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use rand::rngs::StdRng;
use rust_decimal::prelude::ToPrimitive;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use advisor_core::{Decision, DecisionRecord, InflationLevel, MarketRegime, RateTrend, Sentiment};
use advisor_store::StateStore;
use advisor_weights::registry::equal_weights;
use advisor_weights::{calculate_reward, ThompsonSampler, WeightEngine, WeightOptions};

use crate::error::{BacktestError, Result};
use crate::history::PriceHistory;
use crate::indicators::{annualized_volatility, momentum, sma};

/// Which weighting system a run evaluates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemType {
    /// Uniform weights, the no-information baseline
    EqualWeights,

    /// Registry base weights with regime/sector multipliers, no learning
    ExpertWeights,

    /// Full blend of expert and Thompson-sampled weights
    RlWeights,
}

impl SystemType {
    pub const ALL: [Self; 3] = [Self::EqualWeights, Self::ExpertWeights, Self::RlWeights];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EqualWeights => "equal_weights",
            Self::ExpertWeights => "expert_weights",
            Self::RlWeights => "rl_weights",
        }
    }
}

impl std::fmt::Display for SystemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "equal_weights" => Ok(Self::EqualWeights),
            "expert_weights" => Ok(Self::ExpertWeights),
            "rl_weights" => Ok(Self::RlWeights),
            other => Err(format!("unknown system type: {other}")),
        }
    }
}

/// Parameters for one backtest run.
#[derive(Clone, Debug)]
pub struct BacktestConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub system: SystemType,

    /// How many dates to sample (without replacement)
    pub num_decisions: usize,

    /// Whether RL runs update the bandit from outcomes
    pub learning_enabled: bool,
}

impl BacktestConfig {
    pub fn new(start: NaiveDate, end: NaiveDate, system: SystemType) -> Self {
        Self {
            start,
            end,
            system,
            num_decisions: 75,
            learning_enabled: true,
        }
    }

    pub fn with_decisions(mut self, num_decisions: usize) -> Self {
        self.num_decisions = num_decisions;
        self
    }

    pub fn with_learning(mut self, learning_enabled: bool) -> Self {
        self.learning_enabled = learning_enabled;
        self
    }
}

/// Calendar-day buffer left before the dataset's end so every sampled date
/// has a 7-trading-day forward window.
const FORWARD_BUFFER_DAYS: i64 = 10;

/// Sequential backtesting engine over one price history.
pub struct Backtester {
    history: Arc<PriceHistory>,
    store: Arc<dyn StateStore>,
    engine: Arc<WeightEngine>,
    learner: Option<Arc<ThompsonSampler>>,
    rng: StdRng,
    symbol: String,
    rl_options: WeightOptions,
}

impl Backtester {
    pub fn new(
        history: Arc<PriceHistory>,
        store: Arc<dyn StateStore>,
        engine: Arc<WeightEngine>,
        learner: Option<Arc<ThompsonSampler>>,
    ) -> Self {
        Self {
            history,
            store,
            engine,
            learner,
            rng: StdRng::from_entropy(),
            symbol: "NIFTY50".to_string(),
            rl_options: WeightOptions::default(),
        }
    }

    /// Override the RL blend ratio used by the `rl_weights` system.
    pub fn with_blend_ratio(mut self, blend_ratio: f64) -> Self {
        self.rl_options.blend_ratio = blend_ratio;
        self
    }

    /// Seeded construction for reproducible date sampling.
    pub fn with_seed(
        history: Arc<PriceHistory>,
        store: Arc<dyn StateStore>,
        engine: Arc<WeightEngine>,
        learner: Option<Arc<ThompsonSampler>>,
        seed: u64,
    ) -> Self {
        let mut backtester = Self::new(history, store, engine, learner);
        backtester.rng = StdRng::seed_from_u64(seed);
        backtester
    }

    /// Classify the regime from the trailing 20-day price window.
    ///
    /// Without signal agents in the loop, the window stands in for them:
    /// realized volatility proxies inflation concern, a falling market
    /// proxies rising-rate pressure, and the 5-day return sets sentiment.
    pub fn regime_from_history(&self, date: NaiveDate) -> MarketRegime {
        let window = self.history.window_ending(date, 20);
        if window.len() < 10 {
            return MarketRegime::default_neutral();
        }

        let closes: Vec<f64> = window.iter().map(|bar| bar.close_f64()).collect();
        let volatility = annualized_volatility(&closes).unwrap_or(0.15);

        let inflation = if volatility > 0.25 {
            InflationLevel::High
        } else if volatility < 0.15 {
            InflationLevel::Low
        } else {
            InflationLevel::Medium
        };

        let rate_trend = match (sma(&closes, 5), sma(&closes, 20)) {
            (Some(short), Some(long)) if long != 0.0 => {
                let trend = (short - long) / long;
                if trend < -0.02 {
                    RateTrend::Rising
                } else if trend > 0.02 {
                    RateTrend::Falling
                } else {
                    RateTrend::Stable
                }
            }
            _ => RateTrend::Stable,
        };

        let sentiment = match momentum(&closes, 5) {
            Some(recent) if recent > 0.03 => Sentiment::Bullish,
            Some(recent) if recent < -0.03 => Sentiment::Bearish,
            _ => Sentiment::Neutral,
        };

        let regime = MarketRegime::new(inflation, rate_trend, sentiment, volatility);
        tracing::debug!(
            "Regime for {date}: {}, vol={volatility:.3}",
            regime.key()
        );
        regime
    }

    /// Cheap rule-based decision from momentum, regime, and the balance of
    /// the weight distribution. Intentionally simpler than the live LLM
    /// path; it only needs to be a consistent signal for the learner.
    fn simple_decision(
        &self,
        date: NaiveDate,
        regime: &MarketRegime,
        weights: &std::collections::HashMap<String, f64>,
    ) -> (Decision, f64) {
        let window = self.history.window_ending(date, 10);
        if window.len() < 5 {
            return (Decision::Hold, 0.3);
        }

        let closes: Vec<f64> = window.iter().map(|bar| bar.close_f64()).collect();
        let price_momentum = momentum(&closes, 5).unwrap_or(0.0);

        let macro_weight: f64 = ["inflation", "interest_rates", "gdp_growth"]
            .iter()
            .map(|signal| weights.get(*signal).copied().unwrap_or(0.0))
            .sum();
        let company_weight: f64 = ["current", "financial_performance", "earnings_volatility"]
            .iter()
            .map(|signal| weights.get(*signal).copied().unwrap_or(0.0))
            .sum();

        let mut signal = 0.0;

        // Momentum component (40%)
        signal += price_momentum * 0.4;

        // Regime component (30%)
        match regime.sentiment {
            Sentiment::Bullish => signal += 0.03,
            Sentiment::Bearish => signal -= 0.03,
            Sentiment::Neutral => {}
        }

        // Weight-balance component (30%): macro-heavy reads defensive,
        // company-heavy reads growth-focused
        signal += (company_weight - macro_weight) * 0.5 * 0.3;

        let (decision, confidence) = if signal > 0.02 {
            (Decision::Buy, (0.5 + signal.abs() * 10.0).min(0.9))
        } else if signal < -0.02 {
            (Decision::Sell, (0.5 + signal.abs() * 10.0).min(0.9))
        } else {
            (Decision::Hold, 0.6 - signal.abs() * 5.0)
        };

        tracing::debug!(
            "Decision for {date}: {decision} (conf={confidence:.2}), signal={signal:.4}, momentum={price_momentum:.4}"
        );

        (decision, confidence)
    }

    /// Weight distribution for the configured system on a given regime.
    async fn weights_for(
        &self,
        system: SystemType,
        regime: &MarketRegime,
    ) -> std::collections::HashMap<String, f64> {
        match system {
            SystemType::EqualWeights => equal_weights(),
            SystemType::ExpertWeights => {
                self.engine
                    .final_weights_for_regime(regime.clone(), None, WeightOptions::expert_only())
                    .await
                    .weights
            }
            SystemType::RlWeights => {
                self.engine
                    .final_weights_for_regime(regime.clone(), None, self.rl_options)
                    .await
                    .weights
            }
        }
    }

    /// Run one backtest. Returns the evaluated decision records in date
    /// order; each is also persisted with its outcome.
    pub async fn run(&mut self, config: &BacktestConfig) -> Result<Vec<DecisionRecord>> {
        tracing::info!(
            "Starting backtest: {}, {} to {}, {} decisions, learning={}",
            config.system,
            config.start,
            config.end,
            config.num_decisions,
            if config.learning_enabled { "ON" } else { "OFF" }
        );

        if self.history.is_empty() {
            return Err(BacktestError::EmptyHistory);
        }

        let latest_safe = config.end - Duration::days(FORWARD_BUFFER_DAYS);
        let eligible: Vec<NaiveDate> = self
            .history
            .trading_days_between(config.start, config.end)
            .into_iter()
            .filter(|date| *date <= latest_safe)
            .collect();

        if eligible.is_empty() {
            return Err(BacktestError::NoEligibleDays {
                start: config.start,
                end: config.end,
            });
        }
        tracing::info!("Found {} eligible trading days", eligible.len());

        let mut decision_dates: Vec<NaiveDate> = if eligible.len() > config.num_decisions {
            eligible
                .choose_multiple(&mut self.rng, config.num_decisions)
                .copied()
                .collect()
        } else {
            tracing::warn!("Only {} eligible dates available", eligible.len());
            eligible
        };
        decision_dates.sort_unstable();

        let mut results = Vec::with_capacity(decision_dates.len());
        let mut correct_count = 0usize;

        for (index, date) in decision_dates.iter().enumerate() {
            let regime = self.regime_from_history(*date);
            let weights = self.weights_for(config.system, &regime).await;
            let (decision, confidence) = self.simple_decision(*date, &regime, &weights);

            let mut record = DecisionRecord::new(
                &self.symbol,
                decision,
                confidence,
                weights,
                regime.key(),
            )
            .with_sector("Index")
            .with_timestamp(date.and_time(NaiveTime::MIN).and_utc());

            let (return_pct, reward) = self.measure_outcome(&record, *date);
            record.record_outcome(return_pct, reward);

            let decision_id = self.store.record_decision(&record).await?;
            record.id = Some(decision_id);
            self.store
                .record_outcome(decision_id, return_pct, reward)
                .await?;

            if is_correct(decision, return_pct) {
                correct_count += 1;
            }

            if config.learning_enabled && config.system == SystemType::RlWeights {
                if let Some(learner) = &self.learner {
                    learner.update(&record, reward).await?;
                }
            }

            results.push(record);

            if (index + 1) % 25 == 0 {
                let accuracy = correct_count as f64 / (index + 1) as f64 * 100.0;
                tracing::info!(
                    "Progress: {}/{} decisions, accuracy={accuracy:.1}%",
                    index + 1,
                    decision_dates.len()
                );
            }
        }

        let accuracy = correct_count as f64 / results.len().max(1) as f64 * 100.0;
        let avg_reward = results
            .iter()
            .filter_map(|record| record.reward)
            .sum::<f64>()
            / results.len().max(1) as f64;
        tracing::info!(
            "Backtest complete: {}, {} decisions, accuracy={accuracy:.1}%, avg_reward={avg_reward:.3}",
            config.system,
            results.len()
        );

        Ok(results)
    }

    /// Measure the 7-trading-day outcome of a decision. Missing prices are
    /// degenerate input: zero return and zero reward, with a warning.
    fn measure_outcome(&self, record: &DecisionRecord, date: NaiveDate) -> (f64, f64) {
        let price_at = self
            .history
            .price_on(date)
            .and_then(|price| price.to_f64());
        let price_after = self
            .history
            .price_after_trading_days(date, 7)
            .and_then(|price| price.to_f64());

        let (Some(price_at), Some(price_after)) = (price_at, price_after) else {
            tracing::warn!("Could not get prices for {date}");
            return (0.0, 0.0);
        };
        if price_at == 0.0 {
            tracing::warn!("Zero price at {date}");
            return (0.0, 0.0);
        }

        let return_pct = (price_after - price_at) / price_at * 100.0;
        let (reward, _breakdown) = calculate_reward(
            record.decision.as_str(),
            price_at,
            price_after,
            record.confidence,
        );

        tracing::debug!(
            "Outcome for {date}: {} → {return_pct:.2}%, reward={reward:.3}",
            record.decision
        );
        (return_pct, reward)
    }
}

/// Directional correctness per the reward function's bands.
pub fn is_correct(decision: Decision, return_pct: f64) -> bool {
    match decision {
        Decision::Buy => return_pct > 1.0,
        Decision::Sell => return_pct < -1.0,
        Decision::Hold => return_pct.abs() < 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::PriceBar;
    use advisor_store::MemoryStateStore;
    use rust_decimal::Decimal;

    fn synthetic_history(days: u64) -> PriceHistory {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let bars = (0..days)
            .map(|i| {
                let wave = (i as f64 * 0.35).sin() * 4.0;
                let drift = i as f64 * 0.06;
                let close = Decimal::from_f64_retain(100.0 + wave + drift)
                    .unwrap_or(Decimal::ONE_HUNDRED);
                PriceBar::new(start + chrono::Days::new(i), close)
            })
            .collect();
        PriceHistory::from_bars(bars)
    }

    fn backtester(
        history: Arc<PriceHistory>,
        store: Arc<MemoryStateStore>,
        with_learner: bool,
    ) -> Backtester {
        let learner = with_learner.then(|| {
            let shared: Arc<dyn StateStore> = store.clone();
            Arc::new(ThompsonSampler::with_seed(shared, 5))
        });
        let engine = match &learner {
            Some(learner) => Arc::new(WeightEngine::with_learner(learner.clone())),
            None => Arc::new(WeightEngine::new()),
        };
        Backtester::with_seed(history, store, engine, learner, 17)
    }

    #[test]
    fn test_is_correct_bands() {
        assert!(is_correct(Decision::Buy, 1.5));
        assert!(!is_correct(Decision::Buy, 0.5));
        assert!(is_correct(Decision::Sell, -1.5));
        assert!(!is_correct(Decision::Sell, 0.0));
        assert!(is_correct(Decision::Hold, 1.9));
        assert!(!is_correct(Decision::Hold, -2.5));
    }

    #[test]
    fn test_regime_defaults_on_short_window() {
        let history = Arc::new(synthetic_history(5));
        let store = Arc::new(MemoryStateStore::new());
        let backtester = backtester(history, store, false);

        let regime =
            backtester.regime_from_history(NaiveDate::from_ymd_opt(2025, 1, 4).unwrap());
        assert_eq!(regime.key(), "medium_stable_neutral");
        assert_eq!(regime.volatility, 0.15);
    }

    #[tokio::test]
    async fn test_expert_run_produces_evaluated_records() {
        let history = Arc::new(synthetic_history(120));
        let store = Arc::new(MemoryStateStore::new());
        let mut backtester = backtester(history.clone(), store.clone(), false);

        let config = BacktestConfig::new(
            history.first_date().unwrap(),
            history.last_date().unwrap(),
            SystemType::ExpertWeights,
        )
        .with_decisions(20);

        let results = backtester.run(&config).await.unwrap();
        assert_eq!(results.len(), 20);

        for record in &results {
            assert!(record.evaluated);
            assert!(record.outcome_7d.is_some());
            assert!(record.reward.is_some());
            assert!(record.id.is_some());
            let total: f64 = record.weights_used.values().sum();
            assert!((total - 1.0).abs() < 1e-6);
        }

        // Dates are replayed in order
        let timestamps: Vec<_> = results.iter().map(|r| r.timestamp).collect();
        let mut sorted = timestamps.clone();
        sorted.sort();
        assert_eq!(timestamps, sorted);
    }

    #[tokio::test]
    async fn test_rl_run_updates_bandit_state() {
        let history = Arc::new(synthetic_history(120));
        let store = Arc::new(MemoryStateStore::new());
        let mut backtester = backtester(history.clone(), store.clone(), true);

        let config = BacktestConfig::new(
            history.first_date().unwrap(),
            history.last_date().unwrap(),
            SystemType::RlWeights,
        )
        .with_decisions(15);

        let results = backtester.run(&config).await.unwrap();
        assert_eq!(results.len(), 15);
        assert!(store.rl_state_count() > 0, "learning left no state behind");
    }

    #[tokio::test]
    async fn test_learning_disabled_leaves_no_state() {
        let history = Arc::new(synthetic_history(120));
        let store = Arc::new(MemoryStateStore::new());
        let mut backtester = backtester(history.clone(), store.clone(), true);

        let config = BacktestConfig::new(
            history.first_date().unwrap(),
            history.last_date().unwrap(),
            SystemType::RlWeights,
        )
        .with_decisions(10)
        .with_learning(false);

        backtester.run(&config).await.unwrap();
        assert_eq!(store.rl_state_count(), 0);
    }

    #[tokio::test]
    async fn test_equal_weights_are_uniform() {
        let history = Arc::new(synthetic_history(60));
        let store = Arc::new(MemoryStateStore::new());
        let mut backtester = backtester(history.clone(), store, false);

        let config = BacktestConfig::new(
            history.first_date().unwrap(),
            history.last_date().unwrap(),
            SystemType::EqualWeights,
        )
        .with_decisions(5);

        let results = backtester.run(&config).await.unwrap();
        for record in &results {
            for weight in record.weights_used.values() {
                assert!((weight - 1.0 / 15.0).abs() < 1e-9);
            }
        }
    }

    #[tokio::test]
    async fn test_empty_history_errors() {
        let history = Arc::new(PriceHistory::default());
        let store = Arc::new(MemoryStateStore::new());
        let mut backtester = backtester(history, store, false);

        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let config = BacktestConfig::new(start, end, SystemType::ExpertWeights);

        let result = backtester.run(&config).await;
        assert!(matches!(result, Err(BacktestError::EmptyHistory)));
    }
}
