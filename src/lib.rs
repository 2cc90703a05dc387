mod error;
mod features;
mod forecast;
mod history;
mod models;
mod store;
mod training;
mod types;
mod utils;

#[cfg(test)]
mod test_support;

pub use error::WeathercastError;

pub use types::error::TableError;
pub use types::forecast_row::{ForecastRow, ForecastTable, Provenance, PROVENANCE_COLUMN};
pub use types::into_utc_trait::IntoUtcDateTime;
pub use types::weather_code::WeatherCode;
pub use types::weather_record::{
    Parameter, WeatherRecord, IS_DAY_COLUMN, TIME_COLUMN, WEATHER_CODE_COLUMN,
};
pub use types::weather_table::WeatherTable;

pub use features::engineer::*;
pub use features::error::FeatureError;
pub use features::schema::{FeatureRow, FeatureSchema, FEATURE_SCHEMA_VERSION};

pub use models::bundle::ModelBundle;
pub use models::error::ModelError;
pub use models::forest::{ForestConfig, MaxFeatures, RandomForest};
pub use models::precipitation::PrecipitationModel;
pub use models::regression_ensemble::RegressionEnsemble;
pub use models::trained_model::{ModelTarget, TrainedModel};
pub use models::tree::{DecisionTree, Task};
pub use models::weather_code_classifier::WeatherCodeClassifier;

pub use training::error::TrainingError;
pub use training::trainer::{train, ModelScore, TrainingConfig, TrainingOutcome, TrainingReport};
pub use training::training_set::{Holdout, Split, TrainingSet, TrainingSetBuilder, Weighting};

pub use forecast::error::ForecastError;
pub use forecast::forecaster::{Forecast, Forecaster, MAX_HORIZON_HOURS};

pub use history::error::HistoryError;
pub use history::loader::{history_from_frame, load_history_csv, read_history_csv, HISTORY_COLUMNS};

pub use store::bundle_store::{default_bundle_dir, load_bundle, save_bundle, BUNDLE_FILE_NAME};
pub use store::error::BundleStoreError;

pub use utils::get_cache_dir;
