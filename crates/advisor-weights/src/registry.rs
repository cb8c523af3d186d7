//! Weight Registry
//!
//! The fixed 15-signal universe, its category partition, and the
//! expert-assigned base weight distribution.

use std::collections::HashMap;

/// Every signal in the universe, grouped by category.
pub const ALL_SIGNALS: [&str; 15] = [
    // Macro (3)
    "inflation",
    "interest_rates",
    "gdp_growth",
    // Policy (1)
    "policy_changes",
    // Company (8)
    "earnings_volatility",
    "agm",
    "governance",
    "sector_shocks",
    "valuation_shocks",
    "historical",
    "current",
    "financial_performance",
    // Data quality (3)
    "missing_financial_data",
    "missing_sentiment",
    "data_completeness",
];

/// Category a signal belongs to; drives regime multipliers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Macro,
    Policy,
    Company,
    DataQuality,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Macro => "macro",
            Self::Policy => "policy",
            Self::Company => "company",
            Self::DataQuality => "data_quality",
        }
    }
}

/// Category membership. Every universe signal has exactly one category.
pub fn category_of(signal: &str) -> Option<Category> {
    match signal {
        "inflation" | "interest_rates" | "gdp_growth" => Some(Category::Macro),
        "policy_changes" => Some(Category::Policy),
        "earnings_volatility" | "agm" | "governance" | "sector_shocks" | "valuation_shocks"
        | "historical" | "current" | "financial_performance" => Some(Category::Company),
        "missing_financial_data" | "missing_sentiment" | "data_completeness" => {
            Some(Category::DataQuality)
        }
        _ => None,
    }
}

/// Expert-assigned base weight for a universe signal.
///
/// Macro totals 0.25, policy 0.05, company 0.55 (the bulk of a stock
/// decision), data quality 0.15.
pub fn base_weight(signal: &str) -> Option<f64> {
    let weight = match signal {
        "inflation" => 0.10,
        "interest_rates" => 0.10,
        "gdp_growth" => 0.05,
        "policy_changes" => 0.05,
        "earnings_volatility" => 0.08,
        "agm" => 0.03,
        "governance" => 0.05,
        "sector_shocks" => 0.07,
        "valuation_shocks" => 0.08,
        "historical" => 0.08,
        "current" => 0.10,
        "financial_performance" => 0.06,
        "missing_financial_data" => 0.05,
        "missing_sentiment" => 0.05,
        "data_completeness" => 0.05,
        _ => return None,
    };
    Some(weight)
}

/// Base weight distribution over the whole universe. Sums to 1.0.
pub fn base_weights() -> HashMap<String, f64> {
    ALL_SIGNALS
        .iter()
        .map(|signal| {
            let weight = base_weight(signal).unwrap_or(0.0);
            ((*signal).to_string(), weight)
        })
        .collect()
}

/// Uniform distribution over the universe (the no-information baseline).
pub fn equal_weights() -> HashMap<String, f64> {
    let weight = 1.0 / ALL_SIGNALS.len() as f64;
    ALL_SIGNALS
        .iter()
        .map(|signal| ((*signal).to_string(), weight))
        .collect()
}

/// Normalize weights to sum to exactly 1.0.
///
/// An all-zero input falls back to the uniform distribution over the
/// universe rather than dividing by zero.
pub fn normalize_weights(weights: &HashMap<String, f64>) -> HashMap<String, f64> {
    let total: f64 = weights.values().sum();
    if total == 0.0 {
        tracing::warn!("All weights are zero, returning equal weights");
        return equal_weights();
    }

    weights
        .iter()
        .map(|(signal, weight)| (signal.clone(), weight / total))
        .collect()
}

/// Check that a distribution covers the universe exactly, sums to ~1.0, and
/// has no negative entries.
pub fn validate_weights(weights: &HashMap<String, f64>) -> bool {
    let universe: std::collections::HashSet<&str> = ALL_SIGNALS.iter().copied().collect();
    let present: std::collections::HashSet<&str> =
        weights.keys().map(String::as_str).collect();
    if universe != present {
        tracing::error!(
            "Weight validation failed: missing={:?}, extra={:?}",
            universe.difference(&present).collect::<Vec<_>>(),
            present.difference(&universe).collect::<Vec<_>>()
        );
        return false;
    }

    let total: f64 = weights.values().sum();
    if !(0.99..=1.01).contains(&total) {
        tracing::error!("Weights sum to {total}, not 1.0");
        return false;
    }

    if weights.values().any(|w| *w < 0.0) {
        tracing::error!("Some weights are negative");
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_weights_sum_to_one() {
        let weights = base_weights();
        assert_eq!(weights.len(), 15);
        let total: f64 = weights.values().sum();
        assert!((total - 1.0).abs() < 1e-9, "total = {total}");
        assert!(validate_weights(&weights));
    }

    #[test]
    fn test_every_signal_has_one_category() {
        for signal in ALL_SIGNALS {
            assert!(category_of(signal).is_some(), "{signal} uncategorized");
        }
        assert!(category_of("unknown_signal").is_none());
    }

    #[test]
    fn test_category_totals() {
        let weights = base_weights();
        let mut totals: HashMap<Category, f64> = HashMap::new();
        for (signal, weight) in &weights {
            *totals.entry(category_of(signal).unwrap()).or_insert(0.0) += weight;
        }

        assert!((totals[&Category::Macro] - 0.25).abs() < 1e-9);
        assert!((totals[&Category::Policy] - 0.05).abs() < 1e-9);
        assert!((totals[&Category::Company] - 0.55).abs() < 1e-9);
        assert!((totals[&Category::DataQuality] - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_rescales() {
        let mut weights = HashMap::new();
        weights.insert("inflation".to_string(), 2.0);
        weights.insert("current".to_string(), 6.0);

        let normalized = normalize_weights(&weights);
        assert!((normalized["inflation"] - 0.25).abs() < 1e-9);
        assert!((normalized["current"] - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_zero_sum_falls_back_to_uniform() {
        let mut weights = HashMap::new();
        weights.insert("inflation".to_string(), 0.0);

        let normalized = normalize_weights(&weights);
        assert_eq!(normalized.len(), 15);
        for weight in normalized.values() {
            assert!((weight - 1.0 / 15.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_validate_rejects_partial_universe() {
        let mut weights = base_weights();
        weights.remove("agm");
        assert!(!validate_weights(&weights));
    }
}
