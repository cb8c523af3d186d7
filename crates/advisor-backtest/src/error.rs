//! Backtest Error Types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BacktestError>;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("no price history loaded")]
    EmptyHistory,

    #[error("no eligible trading days between {start} and {end}")]
    NoEligibleDays {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] advisor_store::StoreError),

    #[error("weighting error: {0}")]
    Weights(#[from] advisor_weights::WeightError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
