//! Regime Classifier
//!
//! Derives the market regime from signal observations. Total: every input
//! produces a regime, degrading per-field to medium/stable/neutral defaults
//! when a signal is missing or marked insufficient.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use advisor_core::{
    InflationLevel, MarketRegime, RateTrend, Sentiment, SignalObservation, SignalValue,
};

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.?\d*)%").unwrap());

/// Annualized volatility assumed when no indicator is supplied.
pub const DEFAULT_VOLATILITY: f64 = 0.15;

const RISING_TERMS: [&str; 5] = ["rising", "increasing", "hike", "raised", "up"];
const FALLING_TERMS: [&str; 5] = ["falling", "decreasing", "cut", "lowered", "down"];

const BULLISH_TERMS: [&str; 6] = ["buy", "bullish", "positive", "strong", "growth", "outperform"];
const BEARISH_TERMS: [&str; 6] = ["sell", "bearish", "negative", "weak", "decline", "underperform"];

/// Company-oriented signals scanned for sentiment vocabulary.
const SENTIMENT_SIGNALS: [&str; 4] = [
    "current",
    "historical",
    "financial_performance",
    "earnings_volatility",
];

/// Classifies market conditions from agent outputs.
pub struct RegimeClassifier;

impl RegimeClassifier {
    /// Inflation level from the `inflation` signal.
    ///
    /// Keyword matches win over percentages; a bare number is taken as an
    /// already-extracted percentage.
    pub fn inflation_level(observation: Option<&SignalObservation>) -> InflationLevel {
        let Some(observation) = observation else {
            return InflationLevel::Medium;
        };

        if let SignalValue::Number(pct) = &observation.value {
            return Self::inflation_from_pct(*pct);
        }

        let Some(text) = observation.value.search_text() else {
            return InflationLevel::Medium;
        };

        if text.contains("low") || text.contains("deflation") {
            InflationLevel::Low
        } else if text.contains("high") || text.contains("elevated") || text.contains("rising") {
            InflationLevel::High
        } else if let Some(captures) = PERCENT_RE.captures(&text) {
            match captures[1].parse::<f64>() {
                Ok(pct) => Self::inflation_from_pct(pct),
                Err(_) => InflationLevel::Medium,
            }
        } else {
            InflationLevel::Medium
        }
    }

    fn inflation_from_pct(pct: f64) -> InflationLevel {
        if pct < 4.0 {
            InflationLevel::Low
        } else if pct > 6.0 {
            InflationLevel::High
        } else {
            InflationLevel::Medium
        }
    }

    /// Rate trend from the `interest_rates` signal.
    pub fn rate_trend(observation: Option<&SignalObservation>) -> RateTrend {
        let Some(text) = observation.and_then(|obs| obs.value.search_text()) else {
            return RateTrend::Stable;
        };

        if RISING_TERMS.iter().any(|term| text.contains(term)) {
            RateTrend::Rising
        } else if FALLING_TERMS.iter().any(|term| text.contains(term)) {
            RateTrend::Falling
        } else {
            RateTrend::Stable
        }
    }

    /// Sentiment from the company-oriented signals.
    ///
    /// Counts bullish vs bearish vocabulary across each signal's value and
    /// notes; a one-vote margin is required to leave neutral, which stops
    /// the classification flip-flopping on near-ties.
    pub fn sentiment(signals: &HashMap<String, SignalObservation>) -> Sentiment {
        let mut bullish_count = 0;
        let mut bearish_count = 0;

        for name in SENTIMENT_SIGNALS {
            let Some(observation) = signals.get(name) else {
                continue;
            };
            if observation.value.is_insufficient() {
                continue;
            }
            let Some(text) = observation.combined_text() else {
                continue;
            };

            bullish_count += BULLISH_TERMS
                .iter()
                .filter(|term| text.contains(*term))
                .count();
            bearish_count += BEARISH_TERMS
                .iter()
                .filter(|term| text.contains(*term))
                .count();
        }

        if bullish_count > bearish_count + 1 {
            Sentiment::Bullish
        } else if bearish_count > bullish_count + 1 {
            Sentiment::Bearish
        } else {
            Sentiment::Neutral
        }
    }

    /// Volatility from precomputed indicators, defaulting when absent.
    pub fn volatility(technical_indicators: Option<&HashMap<String, f64>>) -> f64 {
        technical_indicators
            .and_then(|indicators| indicators.get("volatility").copied())
            .unwrap_or(DEFAULT_VOLATILITY)
    }

    /// Classify the full regime from one cycle's observations.
    pub fn detect(
        signals: &HashMap<String, SignalObservation>,
        technical_indicators: Option<&HashMap<String, f64>>,
    ) -> MarketRegime {
        let regime = MarketRegime::new(
            Self::inflation_level(signals.get("inflation")),
            Self::rate_trend(signals.get("interest_rates")),
            Self::sentiment(signals),
            Self::volatility(technical_indicators),
        );

        tracing::info!(
            "Detected regime: {}, volatility={:.3}",
            regime.key(),
            regime.volatility
        );
        regime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::SignalValue;

    fn text_signal(name: &str, text: &str) -> SignalObservation {
        SignalObservation::new(name, SignalValue::Text(text.into()), 0.9)
    }

    #[test]
    fn test_inflation_keywords_win() {
        let obs = text_signal("inflation", "Elevated price pressure at 3.2%");
        assert_eq!(
            RegimeClassifier::inflation_level(Some(&obs)),
            InflationLevel::High
        );
    }

    #[test]
    fn test_inflation_from_percentage_text() {
        let obs = text_signal("inflation", "CPI printed at 3.1% in June");
        assert_eq!(
            RegimeClassifier::inflation_level(Some(&obs)),
            InflationLevel::Low
        );

        let obs = text_signal("inflation", "CPI at 6.5%");
        assert_eq!(
            RegimeClassifier::inflation_level(Some(&obs)),
            InflationLevel::High
        );

        let obs = text_signal("inflation", "CPI at 5.0%");
        assert_eq!(
            RegimeClassifier::inflation_level(Some(&obs)),
            InflationLevel::Medium
        );
    }

    #[test]
    fn test_inflation_from_number_value() {
        let obs = SignalObservation::new("inflation", SignalValue::Number(7.2), 0.9);
        assert_eq!(
            RegimeClassifier::inflation_level(Some(&obs)),
            InflationLevel::High
        );
    }

    #[test]
    fn test_inflation_defaults() {
        assert_eq!(
            RegimeClassifier::inflation_level(None),
            InflationLevel::Medium
        );

        let obs = SignalObservation::insufficient("inflation");
        assert_eq!(
            RegimeClassifier::inflation_level(Some(&obs)),
            InflationLevel::Medium
        );

        let obs = text_signal("inflation", "no clear reading this month");
        assert_eq!(
            RegimeClassifier::inflation_level(Some(&obs)),
            InflationLevel::Medium
        );
    }

    #[test]
    fn test_rate_trend_keywords() {
        let obs = text_signal("interest_rates", "Central bank raised rates by 25bps");
        assert_eq!(RegimeClassifier::rate_trend(Some(&obs)), RateTrend::Rising);

        let obs = text_signal("interest_rates", "A 50bps cut is priced in");
        assert_eq!(RegimeClassifier::rate_trend(Some(&obs)), RateTrend::Falling);

        let obs = text_signal("interest_rates", "Policy unchanged");
        assert_eq!(RegimeClassifier::rate_trend(Some(&obs)), RateTrend::Stable);

        assert_eq!(RegimeClassifier::rate_trend(None), RateTrend::Stable);
    }

    #[test]
    fn test_sentiment_needs_margin() {
        // One bullish hit vs none: within the margin, stays neutral
        let mut signals = HashMap::new();
        signals.insert(
            "current".to_string(),
            text_signal("current", "growth on track"),
        );
        assert_eq!(RegimeClassifier::sentiment(&signals), Sentiment::Neutral);

        // Three bullish hits vs one bearish: clears the margin
        signals.insert(
            "historical".to_string(),
            text_signal("historical", "strong positive run, minor decline in Q2"),
        );
        assert_eq!(RegimeClassifier::sentiment(&signals), Sentiment::Bullish);
    }

    #[test]
    fn test_sentiment_bearish() {
        let mut signals = HashMap::new();
        signals.insert(
            "current".to_string(),
            text_signal("current", "weak quarter, sell-side downgrades"),
        );
        signals.insert(
            "financial_performance".to_string(),
            text_signal("financial_performance", "negative margins, decline continues"),
        );
        assert_eq!(RegimeClassifier::sentiment(&signals), Sentiment::Bearish);
    }

    #[test]
    fn test_detect_is_pure() {
        let mut signals = HashMap::new();
        signals.insert(
            "inflation".to_string(),
            text_signal("inflation", "High inflation at 6.5%"),
        );
        signals.insert(
            "interest_rates".to_string(),
            text_signal("interest_rates", "rates raised again"),
        );

        let first = RegimeClassifier::detect(&signals, None);
        let second = RegimeClassifier::detect(&signals, None);
        assert_eq!(first.key(), second.key());
        assert_eq!(first.key(), "high_rising_neutral");
        assert_eq!(first.volatility, DEFAULT_VOLATILITY);
    }

    #[test]
    fn test_detect_empty_defaults() {
        let regime = RegimeClassifier::detect(&HashMap::new(), None);
        assert_eq!(regime.key(), "medium_stable_neutral");
    }

    #[test]
    fn test_volatility_indicator_wins() {
        let mut indicators = HashMap::new();
        indicators.insert("volatility".to_string(), 0.32);
        assert_eq!(RegimeClassifier::volatility(Some(&indicators)), 0.32);
        assert_eq!(RegimeClassifier::volatility(None), DEFAULT_VOLATILITY);
    }
}
