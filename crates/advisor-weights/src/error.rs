//! Weighting Error Types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WeightError>;

#[derive(Error, Debug)]
pub enum WeightError {
    #[error("state store error: {0}")]
    Store(#[from] advisor_store::StoreError),

    #[error("sampling error: {0}")]
    Sampling(String),
}
