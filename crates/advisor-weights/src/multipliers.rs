//! Regime Multiplier Table
//!
//! Category-level multipliers per regime dimension, combined by geometric
//! mean, plus sector-specific per-signal overrides. The geometric mean keeps
//! the combined multiplier close to 1 when the three dimensions disagree,
//! instead of letting one extreme dimension dominate multiplicatively.

use std::collections::HashMap;

use advisor_core::{InflationLevel, MarketRegime, RateTrend, Sentiment};

use crate::registry::{category_of, Category, ALL_SIGNALS};

/// Multiplier applied to a category under an inflation level.
pub fn inflation_multiplier(level: InflationLevel, category: Category) -> f64 {
    match (level, category) {
        // Low inflation: company fundamentals over macro
        (InflationLevel::Low, Category::Macro) => 0.7,
        (InflationLevel::Low, Category::Company) => 1.2,
        (InflationLevel::Low, Category::Policy) => 0.8,
        (InflationLevel::Low, Category::DataQuality) => 1.0,

        (InflationLevel::Medium, _) => 1.0,

        // High inflation: macro and policy dominate
        (InflationLevel::High, Category::Macro) => 1.5,
        (InflationLevel::High, Category::Company) => 0.8,
        (InflationLevel::High, Category::Policy) => 1.2,
        (InflationLevel::High, Category::DataQuality) => 1.0,
    }
}

/// Multiplier applied to a category under a rate trend.
pub fn rate_multiplier(trend: RateTrend, category: Category) -> f64 {
    match (trend, category) {
        (RateTrend::Falling, Category::Macro) => 1.3,
        (RateTrend::Falling, Category::Company) => 0.9,
        (RateTrend::Falling, Category::Policy) => 1.1,
        (RateTrend::Falling, Category::DataQuality) => 1.0,

        (RateTrend::Stable, Category::Macro) => 0.9,
        (RateTrend::Stable, Category::Company) => 1.1,
        (RateTrend::Stable, Category::Policy) => 0.9,
        (RateTrend::Stable, Category::DataQuality) => 1.0,

        // Rising rates matter most
        (RateTrend::Rising, Category::Macro) => 1.4,
        (RateTrend::Rising, Category::Company) => 0.8,
        (RateTrend::Rising, Category::Policy) => 1.1,
        (RateTrend::Rising, Category::DataQuality) => 1.0,
    }
}

/// Multiplier applied to a category under a sentiment reading.
pub fn sentiment_multiplier(sentiment: Sentiment, category: Category) -> f64 {
    match (sentiment, category) {
        // Data quality matters more in uncertain times
        (Sentiment::Bearish, Category::Macro) => 1.1,
        (Sentiment::Bearish, Category::Company) => 0.95,
        (Sentiment::Bearish, Category::Policy) => 1.05,
        (Sentiment::Bearish, Category::DataQuality) => 1.1,

        (Sentiment::Neutral, _) => 1.0,

        (Sentiment::Bullish, Category::Macro) => 0.9,
        (Sentiment::Bullish, Category::Company) => 1.1,
        (Sentiment::Bullish, Category::Policy) => 0.95,
        (Sentiment::Bullish, Category::DataQuality) => 0.95,
    }
}

/// Per-signal overrides for sectors with known sensitivities. Applied on top
/// of the regime multipliers, compounding directly.
pub fn sector_overrides(sector: &str) -> &'static [(&'static str, f64)] {
    match sector.to_lowercase().as_str() {
        "banking" => &[("interest_rates", 1.5), ("inflation", 1.2)],
        "it" => &[("interest_rates", 1.3), ("current", 1.2)],
        "pharma" => &[("policy_changes", 1.4), ("governance", 1.2)],
        "energy" => &[("inflation", 1.3), ("sector_shocks", 1.3)],
        "fmcg" => &[("gdp_growth", 1.2), ("current", 1.1)],
        _ => &[],
    }
}

/// Apply regime and sector multipliers to a base distribution.
///
/// Per signal, the three dimension multipliers combine as a geometric mean;
/// sector overrides then multiply the named signals directly. The result is
/// NOT normalized; the caller owns normalization.
pub fn apply_regime_multipliers(
    base_weights: &HashMap<String, f64>,
    regime: &MarketRegime,
    sector: Option<&str>,
) -> HashMap<String, f64> {
    let mut adjusted = base_weights.clone();

    for signal in ALL_SIGNALS {
        let Some(category) = category_of(signal) else {
            continue;
        };
        let combined = (inflation_multiplier(regime.inflation, category)
            * rate_multiplier(regime.rate_trend, category)
            * sentiment_multiplier(regime.sentiment, category))
        .cbrt();

        if let Some(weight) = adjusted.get_mut(signal) {
            *weight *= combined;
        }
    }

    if let Some(sector) = sector {
        for (signal, multiplier) in sector_overrides(sector) {
            if let Some(weight) = adjusted.get_mut(*signal) {
                *weight *= multiplier;
            }
        }
    }

    tracing::debug!("Applied regime multipliers for {}", regime.key());
    adjusted
}
