use crate::features::error::FeatureError;
use crate::models::error::ModelError;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Target {target} is more than {horizon_hours} hours after the latest observation at {latest}")]
    HorizonExceeded {
        target: DateTime<Utc>,
        latest: DateTime<Utc>,
        horizon_hours: i64,
    },

    #[error("No observation exists at {0}, which lies inside the observed history")]
    ObservationNotFound(DateTime<Utc>),

    #[error("Target {0} is not aligned to the start of an hour")]
    UnalignedTimestamp(DateTime<Utc>),

    #[error("Cannot forecast from a table without observed rows")]
    EmptyHistory,

    #[error("Forecasting {target} needs {required} preceding rows for lag features, but only {available} exist")]
    LagUnavailable {
        target: DateTime<Utc>,
        required: usize,
        available: usize,
    },

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Model(#[from] ModelError),
}
