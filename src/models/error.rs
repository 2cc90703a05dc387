use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model '{model}' requires feature column '{column}', which is missing")]
    FeatureMismatch { model: String, column: String },

    #[error("Model '{model}' received an undefined value for feature '{column}'")]
    UndefinedFeature { model: String, column: String },

    #[error("Invalid forest configuration for model '{model}': {reason}")]
    InvalidForestConfig { model: String, reason: String },

    #[error("Model '{model}' cannot be fit: {reason}")]
    InvalidTrainingData { model: String, reason: String },

    #[error("Polars operation failed for model '{model}': {source}")]
    Polars {
        model: String,
        #[source]
        source: PolarsError,
    },
}
