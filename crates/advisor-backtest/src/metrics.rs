//! Performance Metrics
//!
//! Aggregates evaluated decision records into per-system metrics and renders
//! the train/test comparison table.

use serde::Serialize;

use advisor_core::{Decision, DecisionRecord};

use crate::driver::{is_correct, SystemType};

/// Aggregate performance of one system over a set of evaluated decisions.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SystemMetrics {
    pub total_decisions: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub avg_reward: f64,
    pub std_reward: f64,
    pub avg_return: f64,
    pub std_return: f64,
    pub sharpe_ratio: f64,
    pub max_return: f64,
    pub min_return: f64,
    pub buy_count: usize,
    pub sell_count: usize,
    pub hold_count: usize,
    pub buy_accuracy: f64,
    pub sell_accuracy: f64,
    pub hold_accuracy: f64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Compute metrics over evaluated records. Unevaluated records are skipped.
pub fn calculate_metrics(records: &[DecisionRecord]) -> SystemMetrics {
    let evaluated: Vec<_> = records.iter().filter(|r| r.evaluated).collect();
    if evaluated.is_empty() {
        return SystemMetrics::default();
    }

    let mut metrics = SystemMetrics {
        total_decisions: evaluated.len(),
        ..SystemMetrics::default()
    };

    let mut rewards = Vec::with_capacity(evaluated.len());
    let mut returns = Vec::with_capacity(evaluated.len());
    let mut correct_by_type = [0usize; 3];
    let mut total_by_type = [0usize; 3];

    for record in &evaluated {
        let outcome = record.outcome_7d.unwrap_or(0.0);
        let reward = record.reward.unwrap_or(0.0);

        let type_index = match record.decision {
            Decision::Buy => 0,
            Decision::Sell => 1,
            Decision::Hold => 2,
        };
        total_by_type[type_index] += 1;

        if is_correct(record.decision, outcome) {
            metrics.correct += 1;
            correct_by_type[type_index] += 1;
        }

        rewards.push(reward);
        returns.push(outcome);
    }

    metrics.accuracy = metrics.correct as f64 / metrics.total_decisions as f64 * 100.0;
    metrics.avg_reward = mean(&rewards);
    metrics.std_reward = std_dev(&rewards);
    metrics.avg_return = mean(&returns);
    metrics.std_return = std_dev(&returns);
    metrics.sharpe_ratio = if metrics.std_return > 0.0 {
        metrics.avg_return / metrics.std_return
    } else {
        0.0
    };
    metrics.max_return = returns.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    metrics.min_return = returns.iter().copied().fold(f64::INFINITY, f64::min);

    let accuracy_of = |correct: usize, total: usize| {
        if total > 0 {
            correct as f64 / total as f64 * 100.0
        } else {
            0.0
        }
    };
    metrics.buy_count = total_by_type[0];
    metrics.sell_count = total_by_type[1];
    metrics.hold_count = total_by_type[2];
    metrics.buy_accuracy = accuracy_of(correct_by_type[0], total_by_type[0]);
    metrics.sell_accuracy = accuracy_of(correct_by_type[1], total_by_type[1]);
    metrics.hold_accuracy = accuracy_of(correct_by_type[2], total_by_type[2]);

    metrics
}

/// Cohen's d effect size between two reward samples.
pub fn cohens_d(a: &[f64], b: &[f64]) -> f64 {
    let pooled = ((std_dev(a).powi(2) + std_dev(b).powi(2)) / 2.0).sqrt();
    if pooled > 0.0 {
        (mean(a) - mean(b)) / pooled
    } else {
        0.0
    }
}

pub fn effect_size_label(d: f64) -> &'static str {
    let magnitude = d.abs();
    if magnitude > 0.8 {
        "large"
    } else if magnitude > 0.5 {
        "medium"
    } else {
        "small"
    }
}

/// Markdown comparison table over named phases (e.g. "Training", "Testing"),
/// one row per system.
pub fn comparison_table(phases: &[(&str, Vec<(SystemType, SystemMetrics)>)]) -> String {
    let mut lines = Vec::new();
    lines.push("# Backtest Results Comparison".to_string());

    for (phase, systems) in phases {
        lines.push(String::new());
        lines.push(format!("## {phase} Phase"));
        lines.push(String::new());
        lines.push("| System | Accuracy | Avg Reward | Avg Return | Sharpe |".to_string());
        lines.push("|--------|----------|------------|------------|--------|".to_string());

        for (system, metrics) in systems {
            lines.push(format!(
                "| {} | {:.1}% | {:.3} | {:.2}% | {:.3} |",
                system, metrics.accuracy, metrics.avg_reward, metrics.avg_return,
                metrics.sharpe_ratio
            ));
        }
    }

    lines.join("\n")
}
