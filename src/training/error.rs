use crate::features::error::FeatureError;
use crate::models::error::ModelError;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("No complete training rows remain for model '{model}' after dropping rows with undefined features")]
    DataInsufficiency { model: String },

    #[error("Cannot train on an empty observation history")]
    EmptyHistory,

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Polars operation failed while {stage}: {source}")]
    Polars {
        stage: String,
        #[source]
        source: PolarsError,
    },
}
