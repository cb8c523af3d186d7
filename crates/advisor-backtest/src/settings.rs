//! Runtime Settings
//!
//! Environment-driven configuration for the backtest binary. Each setting is
//! resolved through an explicit priority chain (environment, then default)
//! and the winning source is logged at the decision point.

use std::path::PathBuf;

use chrono::NaiveDate;

/// Which source produced a setting's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingSource {
    Env,
    Default,
}

impl SettingSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Env => "env",
            Self::Default => "default",
        }
    }
}

/// Resolved backtest configuration.
#[derive(Clone, Debug)]
pub struct Settings {
    /// SQLite database path for bandit state and decision history
    pub db_path: String,

    /// Directory scanned for price CSV exports
    pub data_dir: PathBuf,

    /// Decisions sampled per phase and system
    pub decisions_per_phase: usize,

    /// Train/test boundary; `None` selects the dataset midpoint
    pub split_date: Option<NaiveDate>,

    /// RNG seed for reproducible runs
    pub seed: Option<u64>,

    /// Blend ratio for the RL system
    pub blend_ratio: f64,
}

fn resolve<T, F>(key: &str, default: T, parse: F) -> T
where
    T: std::fmt::Debug,
    F: FnOnce(&str) -> Option<T>,
{
    let (value, source) = match std::env::var(key) {
        Ok(raw) => match parse(&raw) {
            Some(parsed) => (parsed, SettingSource::Env),
            None => {
                tracing::warn!("Ignoring unparseable {key}={raw}");
                (default, SettingSource::Default)
            }
        },
        Err(_) => (default, SettingSource::Default),
    };
    tracing::info!("setting {key}={value:?} ({})", source.as_str());
    value
}

impl Settings {
    /// Resolve every setting from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            db_path: resolve("ADVISOR_DB", "backtest.db".to_string(), |raw| {
                Some(raw.to_string())
            }),
            data_dir: resolve("ADVISOR_DATA_DIR", PathBuf::from("data"), |raw| {
                Some(PathBuf::from(raw))
            }),
            decisions_per_phase: resolve("BACKTEST_DECISIONS", 75, |raw| raw.parse().ok()),
            split_date: resolve("BACKTEST_SPLIT", None, |raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(Some)
            }),
            seed: resolve("BACKTEST_SEED", None, |raw| raw.parse().ok().map(Some)),
            blend_ratio: resolve("RL_BLEND_RATIO", 0.7, |raw| {
                raw.parse::<f64>().ok().filter(|r| (0.0..=1.0).contains(r))
            }),
        }
    }
}
