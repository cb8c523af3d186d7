//! Reward Function
//!
//! Converts a decision, its realized 7-day price outcome, and the stated
//! confidence into a scalar reward in roughly [-0.8, +1.7].

use serde::Serialize;

/// Per-component breakdown of a computed reward.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RewardBreakdown {
    pub return_pct: f64,
    pub directional_reward: f64,
    pub confidence_reward: f64,
    pub magnitude_bonus: f64,
    pub total_reward: f64,
    pub is_correct: bool,
}

/// Calculate the reward for a decision and its outcome.
///
/// Components:
/// 1. Directional accuracy: BUY pays off above +1%, SELL below -1%, HOLD
///    inside ±2%; wrong directional calls cost -0.5 (-0.2 for HOLD).
/// 2. Confidence calibration: high confidence on a wrong call is punished
///    harder (-0.3) than it is rewarded on a right one (+0.2).
/// 3. Magnitude bonus: correct calls earn up to +0.5 scaled by |return|/20.
///
/// A zero entry price is degenerate input: returns `(0.0, empty breakdown)`
/// without computing anything. An unrecognized decision label contributes no
/// directional reward but still pays the calibration penalty as an incorrect
/// call.
pub fn calculate_reward(
    decision: &str,
    price_at_decision: f64,
    price_after_7d: f64,
    confidence: f64,
) -> (f64, RewardBreakdown) {
    if price_at_decision == 0.0 {
        tracing::error!("Invalid price_at_decision: 0");
        return (0.0, RewardBreakdown::default());
    }

    let return_pct = ((price_after_7d - price_at_decision) / price_at_decision) * 100.0;

    let mut is_correct = false;
    let directional_reward = match decision {
        "BUY" => {
            if return_pct > 1.0 {
                is_correct = true;
                1.0
            } else if return_pct < -1.0 {
                -0.5
            } else {
                0.0
            }
        }
        "SELL" => {
            if return_pct < -1.0 {
                is_correct = true;
                1.0
            } else if return_pct > 1.0 {
                -0.5
            } else {
                0.0
            }
        }
        "HOLD" => {
            if return_pct.abs() < 2.0 {
                is_correct = true;
                0.5
            } else {
                // A large move should have been BUY or SELL
                -0.2
            }
        }
        other => {
            tracing::warn!("Unknown decision: {other}");
            0.0
        }
    };

    let confidence_reward = if is_correct {
        if confidence > 0.7 {
            0.2
        } else if confidence > 0.5 {
            0.1
        } else {
            0.0
        }
    } else if confidence > 0.7 {
        -0.3
    } else if confidence > 0.5 {
        -0.15
    } else {
        0.0
    };

    let magnitude_bonus = if is_correct {
        (return_pct.abs() / 20.0).min(0.5)
    } else {
        0.0
    };

    let total_reward = directional_reward + confidence_reward + magnitude_bonus;

    let breakdown = RewardBreakdown {
        return_pct,
        directional_reward,
        confidence_reward,
        magnitude_bonus,
        total_reward,
        is_correct,
    };

    tracing::info!(
        "Reward: {:.3} for {} (return={:.2}%, conf={:.2}, correct={})",
        total_reward,
        decision,
        return_pct,
        confidence,
        is_correct
    );

    (total_reward, breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_correct_buy_just_past_threshold() {
        let (reward, breakdown) = calculate_reward("BUY", 100.0, 101.5, 0.9);
        assert_close(breakdown.directional_reward, 1.0);
        assert_close(breakdown.confidence_reward, 0.2);
        assert_close(breakdown.magnitude_bonus, 0.075);
        assert_close(reward, 1.275);
        assert!(breakdown.is_correct);
    }

    #[test]
    fn test_correct_hold_with_boundary_confidence() {
        let (reward, breakdown) = calculate_reward("HOLD", 100.0, 100.5, 0.5);
        assert_close(breakdown.return_pct, 0.5);
        assert_close(breakdown.directional_reward, 0.5);
        // 0.5 is not strictly above the 0.5 threshold
        assert_close(breakdown.confidence_reward, 0.0);
        assert_close(breakdown.magnitude_bonus, 0.025);
        assert_close(reward, 0.525);
    }

    #[test]
    fn test_sell_mirrors_buy() {
        let (reward, breakdown) = calculate_reward("SELL", 100.0, 95.0, 0.7);
        assert_close(breakdown.directional_reward, 1.0);
        // 0.7 is not strictly above 0.7
        assert_close(breakdown.confidence_reward, 0.1);
        assert_close(breakdown.magnitude_bonus, 0.25);
        assert_close(reward, 1.35);

        let (_, breakdown) = calculate_reward("SELL", 100.0, 105.0, 0.8);
        assert_close(breakdown.directional_reward, -0.5);
        assert!(!breakdown.is_correct);
    }

    #[test]
    fn test_overconfident_wrong_call_is_punished_harder() {
        let (wrong, _) = calculate_reward("BUY", 100.0, 95.0, 0.9);
        assert_close(wrong, -0.8);

        let (right, _) = calculate_reward("BUY", 100.0, 105.0, 0.9);
        // +1.0 directional, +0.2 confidence, +0.25 magnitude
        assert_close(right, 1.45);
    }

    #[test]
    fn test_hold_misses_big_move() {
        let (reward, breakdown) = calculate_reward("HOLD", 100.0, 106.0, 0.4);
        assert_close(breakdown.directional_reward, -0.2);
        assert_close(breakdown.confidence_reward, 0.0);
        assert_close(reward, -0.2);
    }

    #[test]
    fn test_neutral_buy_still_pays_calibration_penalty() {
        // Price barely moved: no directional reward, but the confident call
        // was not correct either
        let (reward, breakdown) = calculate_reward("BUY", 100.0, 100.5, 0.8);
        assert_close(breakdown.directional_reward, 0.0);
        assert_close(breakdown.confidence_reward, -0.3);
        assert_close(reward, -0.3);
    }

    #[test]
    fn test_zero_price_guard() {
        let (reward, breakdown) = calculate_reward("BUY", 0.0, 100.0, 0.5);
        assert_close(reward, 0.0);
        assert_eq!(breakdown, RewardBreakdown::default());
    }

    #[test]
    fn test_unknown_label_gets_zero_directional() {
        let (reward, breakdown) = calculate_reward("SHORT", 100.0, 110.0, 0.9);
        assert_close(breakdown.directional_reward, 0.0);
        assert_close(breakdown.confidence_reward, -0.3);
        assert_close(breakdown.magnitude_bonus, 0.0);
        assert_close(reward, -0.3);
    }

    #[test]
    fn test_magnitude_bonus_caps() {
        let (_, breakdown) = calculate_reward("BUY", 100.0, 130.0, 0.9);
        assert_close(breakdown.magnitude_bonus, 0.5);
    }
}
