use crate::types::error::TableError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to read history CSV '{path}'")]
    CsvRead {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("History is missing required column '{0}'")]
    MissingColumn(String),

    #[error("History column '{column}' has no usable value in row {row}")]
    MissingValue { column: String, row: usize },

    #[error("History row {row} has an unparseable timestamp '{value}'")]
    InvalidTimestamp { row: usize, value: String },

    #[error("History column '{column}' has unsupported type {dtype}")]
    UnsupportedColumnType { column: String, dtype: String },

    #[error("Failed processing history DataFrame: {0}")]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
