//! Backtest Runner
//!
//! Runs the full weighting-system comparison (equal vs expert vs RL) over
//! a train/test split of the loaded price history, prints the comparison
//! table, and dumps the raw decision records to JSON.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::Days;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use advisor_backtest::metrics::{cohens_d, effect_size_label};
use advisor_backtest::{
    calculate_metrics, comparison_table, BacktestConfig, Backtester, PriceHistory, Settings,
    SystemType,
};
use advisor_core::DecisionRecord;
use advisor_store::{SqliteStateStore, StateStore};
use advisor_weights::{ThompsonSampler, WeightEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let settings = Settings::from_env();

    // Load every CSV export in the data directory
    let mut csv_paths: Vec<_> = std::fs::read_dir(&settings.data_dir)
        .with_context(|| format!("reading data dir {}", settings.data_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    csv_paths.sort();
    anyhow::ensure!(
        !csv_paths.is_empty(),
        "no CSV files in {}; export daily index data there first",
        settings.data_dir.display()
    );

    let history = Arc::new(PriceHistory::from_csv_files(&csv_paths)?);
    let first = history.first_date().context("empty price history")?;
    let last = history.last_date().context("empty price history")?;

    // Train on the first half, test on the second (unless overridden)
    let split = settings.split_date.unwrap_or_else(|| {
        let bars = history.bars();
        bars[bars.len() / 2].date
    });
    tracing::info!("Train: {first} to {split}  |  Test: after {split} to {last}");

    // Shared store and learner across every phase
    let store: Arc<dyn StateStore> = Arc::new(SqliteStateStore::connect(&settings.db_path).await?);
    let learner = Arc::new(match settings.seed {
        Some(seed) => ThompsonSampler::with_seed(store.clone(), seed),
        None => ThompsonSampler::new(store.clone()),
    });
    let engine = Arc::new(WeightEngine::with_learner(learner.clone()));

    let mut backtester = match settings.seed {
        Some(seed) => {
            Backtester::with_seed(history.clone(), store, engine, Some(learner), seed)
        }
        None => Backtester::new(history.clone(), store, engine, Some(learner)),
    }
    .with_blend_ratio(settings.blend_ratio);

    let test_start = split + Days::new(1);
    let mut results: BTreeMap<String, Vec<DecisionRecord>> = BTreeMap::new();

    // Training phase: RL learns from its own outcomes
    for system in SystemType::ALL {
        let config = BacktestConfig::new(first, split, system)
            .with_decisions(settings.decisions_per_phase)
            .with_learning(system == SystemType::RlWeights);
        let records = backtester.run(&config).await?;
        results.insert(format!("train_{system}"), records);
    }

    // Testing phase: learning frozen, measuring what was learned
    for system in SystemType::ALL {
        let config = BacktestConfig::new(test_start, last, system)
            .with_decisions(settings.decisions_per_phase)
            .with_learning(false);
        let records = backtester.run(&config).await?;
        results.insert(format!("test_{system}"), records);
    }

    // Comparison table
    let phase_metrics = |prefix: &str| {
        SystemType::ALL
            .iter()
            .map(|system| {
                let records = &results[&format!("{prefix}_{system}")];
                (*system, calculate_metrics(records))
            })
            .collect::<Vec<_>>()
    };
    let table = comparison_table(&[
        ("Training", phase_metrics("train")),
        ("Testing", phase_metrics("test")),
    ]);
    println!("{table}");

    // Effect size of RL over expert on the held-out phase
    let rewards_of = |key: &str| {
        results[key]
            .iter()
            .filter_map(|record| record.reward)
            .collect::<Vec<f64>>()
    };
    let d = cohens_d(
        &rewards_of("test_rl_weights"),
        &rewards_of("test_expert_weights"),
    );
    println!();
    println!(
        "RL vs Expert (test): Cohen's d = {:.3} ({} effect)",
        d,
        effect_size_label(d)
    );

    // Raw records for downstream analysis
    let output = "backtest_results.json";
    std::fs::write(output, serde_json::to_string_pretty(&results)?)?;
    tracing::info!("Saved results to {output}");

    Ok(())
}
