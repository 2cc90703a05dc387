use crate::types::error::TableError;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Invalid feature configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Feature engineering failed: {0}")]
    Polars(#[from] PolarsError),

    #[error("Row {index} is out of bounds for a feature frame of height {height}")]
    RowOutOfBounds { index: usize, height: usize },
}
