use chrono::{DateTime, Utc};
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Duplicate observation timestamp {0}")]
    DuplicateTimestamp(DateTime<Utc>),

    #[error("Timestamp {0} is not aligned to the start of an hour")]
    UnalignedTimestamp(DateTime<Utc>),

    #[error("Rows are not in strictly increasing time order at {0}")]
    Unordered(DateTime<Utc>),

    #[error("Failed to build DataFrame from weather records")]
    FrameBuild(#[source] PolarsError),
}
