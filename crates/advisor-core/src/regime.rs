//! Market Regime
//!
//! Discrete classification of market conditions. The categorical components
//! form the persistence key; volatility rides alongside as a continuous
//! measure and is deliberately excluded from the key so bandit learning is
//! grouped at the categorical level.

use serde::{Deserialize, Serialize};

/// Inflation environment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InflationLevel {
    Low,
    Medium,
    High,
}

impl InflationLevel {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Direction of interest rates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateTrend {
    Falling,
    Stable,
    Rising,
}

impl RateTrend {
    pub const ALL: [Self; 3] = [Self::Falling, Self::Stable, Self::Rising];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Falling => "falling",
            Self::Stable => "stable",
            Self::Rising => "rising",
        }
    }
}

/// Aggregate market mood
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bearish,
    Neutral,
    Bullish,
}

impl Sentiment {
    pub const ALL: [Self; 3] = [Self::Bearish, Self::Neutral, Self::Bullish];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bearish => "bearish",
            Self::Neutral => "neutral",
            Self::Bullish => "bullish",
        }
    }
}

/// Market regime: categorical macro state plus continuous volatility.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketRegime {
    pub inflation: InflationLevel,
    pub rate_trend: RateTrend,
    pub sentiment: Sentiment,

    /// Annualized volatility (0.0 and up)
    pub volatility: f64,
}

impl MarketRegime {
    pub fn new(
        inflation: InflationLevel,
        rate_trend: RateTrend,
        sentiment: Sentiment,
        volatility: f64,
    ) -> Self {
        Self {
            inflation,
            rate_trend,
            sentiment,
            volatility,
        }
    }

    /// Neutral default used when no usable inputs are available.
    pub fn default_neutral() -> Self {
        Self::new(
            InflationLevel::Medium,
            RateTrend::Stable,
            Sentiment::Neutral,
            0.15,
        )
    }

    /// Grouping key for persisted bandit state.
    ///
    /// Volatility is excluded: two regimes that differ only in volatility
    /// share one learning bucket.
    pub fn key(&self) -> String {
        format!(
            "{}_{}_{}",
            self.inflation.as_str(),
            self.rate_trend.as_str(),
            self.sentiment.as_str()
        )
    }

    /// One-hot feature vector (3+3+3 categorical) with volatility appended.
    ///
    /// Unlike [`MarketRegime::key`], the vector does carry volatility; any
    /// vector-based consumer sees finer granularity than the persisted
    /// bandit state.
    pub fn to_vector(&self) -> Vec<f64> {
        let mut vector = Vec::with_capacity(10);
        vector.extend(
            InflationLevel::ALL
                .iter()
                .map(|level| if *level == self.inflation { 1.0 } else { 0.0 }),
        );
        vector.extend(
            RateTrend::ALL
                .iter()
                .map(|trend| if *trend == self.rate_trend { 1.0 } else { 0.0 }),
        );
        vector.extend(
            Sentiment::ALL
                .iter()
                .map(|s| if *s == self.sentiment { 1.0 } else { 0.0 }),
        );
        vector.push(self.volatility);
        vector
    }

    /// Plain-language description for rationale text.
    pub fn describe(&self) -> String {
        let inflation = match self.inflation {
            InflationLevel::Low => "low inflation (< 4%)",
            InflationLevel::Medium => "moderate inflation (4-6%)",
            InflationLevel::High => "high inflation (> 6%)",
        };
        let rates = match self.rate_trend {
            RateTrend::Falling => "falling interest rates",
            RateTrend::Stable => "stable interest rates",
            RateTrend::Rising => "rising interest rates",
        };
        let sentiment = match self.sentiment {
            Sentiment::Bearish => "bearish market sentiment",
            Sentiment::Neutral => "neutral market sentiment",
            Sentiment::Bullish => "bullish market sentiment",
        };
        let volatility = if self.volatility > 0.25 {
            "very high volatility"
        } else if self.volatility > 0.20 {
            "high volatility"
        } else if self.volatility > 0.15 {
            "moderate volatility"
        } else {
            "low volatility"
        };

        format!(
            "Market regime: {}, {}, {}, with {} ({:.1}% annualized)",
            inflation,
            rates,
            sentiment,
            volatility,
            self.volatility * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_excludes_volatility() {
        let a = MarketRegime::new(
            InflationLevel::High,
            RateTrend::Rising,
            Sentiment::Bearish,
            0.25,
        );
        let b = MarketRegime::new(
            InflationLevel::High,
            RateTrend::Rising,
            Sentiment::Bearish,
            0.45,
        );

        assert_eq!(a.key(), "high_rising_bearish");
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_vector_includes_volatility() {
        let regime = MarketRegime::new(
            InflationLevel::Low,
            RateTrend::Stable,
            Sentiment::Bullish,
            0.18,
        );
        let vector = regime.to_vector();

        assert_eq!(vector.len(), 10);
        assert_eq!(vector[0], 1.0); // low inflation
        assert_eq!(vector[4], 1.0); // stable rates
        assert_eq!(vector[8], 1.0); // bullish
        assert_eq!(vector[9], 0.18);
    }

    #[test]
    fn test_default_neutral_key() {
        assert_eq!(MarketRegime::default_neutral().key(), "medium_stable_neutral");
    }
}
