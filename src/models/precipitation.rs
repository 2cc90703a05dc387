use crate::features::engineer::{FeatureConfig, CALENDAR_FEATURES};
use crate::features::schema::{FeatureRow, FeatureSchema};
use crate::models::error::ModelError;
use crate::models::forest::ForestConfig;
use crate::models::trained_model::{ModelTarget, TrainedModel};
use crate::models::tree::Task;
use crate::training::error::TrainingError;
use crate::training::training_set::{TrainingSet, TrainingSetBuilder, Weighting};
use crate::types::weather_record::Parameter;
use log::info;
use serde::{Deserialize, Serialize};

/// Dedicated precipitation regressor.
///
/// Rainfall depends on moisture and pressure more than on its own history, so this model
/// sees the lags of precipitation, humidity, cloud cover and surface pressure. Rows are
/// weighted uniformly and predictions are never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecipitationModel {
    model: TrainedModel,
}

impl PrecipitationModel {
    /// Parameters whose lags feed the model.
    pub const INPUT_PARAMETERS: [Parameter; 4] = [
        Parameter::Precipitation,
        Parameter::Humidity,
        Parameter::CloudCover,
        Parameter::SurfacePressure,
    ];

    pub fn schema(features: &FeatureConfig) -> FeatureSchema {
        let mut columns: Vec<String> = CALENDAR_FEATURES.iter().map(|c| c.to_string()).collect();
        for parameter in Self::INPUT_PARAMETERS {
            columns.extend(features.lags_of(parameter.column_name()));
        }
        FeatureSchema::new(columns)
    }

    pub(crate) fn fit(
        builder: &TrainingSetBuilder,
        features: &FeatureConfig,
        forest: &ForestConfig,
    ) -> Result<Self, TrainingError> {
        let set = Self::training_set(builder, features)?;
        info!("Fitting precipitation model on {} rows", set.len());
        let model = TrainedModel::fit(
            ModelTarget::Parameter(Parameter::Precipitation),
            Self::schema(features),
            &set,
            Task::Regression,
            forest,
        )?;
        Ok(Self { model })
    }

    /// Unweighted training set of the model.
    pub(crate) fn training_set(
        builder: &TrainingSetBuilder,
        features: &FeatureConfig,
    ) -> Result<TrainingSet, TrainingError> {
        let target = ModelTarget::Parameter(Parameter::Precipitation);
        builder.assemble(
            &target.to_string(),
            &Self::schema(features),
            target.column(),
            Weighting::Uniform,
        )
    }

    /// Predicted precipitation in mm, at least 0.
    pub fn predict(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        Ok(Parameter::Precipitation.clamp_to_range(self.model.predict_value(row)?))
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }
}
