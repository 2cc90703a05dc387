use crate::features::error::FeatureError;
use crate::forecast::error::ForecastError;
use crate::history::error::HistoryError;
use crate::models::error::ModelError;
use crate::store::error::BundleStoreError;
use crate::training::error::TrainingError;
use crate::types::error::TableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeathercastError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Training(#[from] TrainingError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    BundleStore(#[from] BundleStoreError),
}
