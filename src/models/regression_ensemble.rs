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
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One regressor per continuous parameter except precipitation.
///
/// The regressor of parameter `p` sees the calendar features and the lags of `p` itself.
/// Its predictions are clamped to the physical range of `p`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionEnsemble {
    models: BTreeMap<Parameter, TrainedModel>,
}

impl RegressionEnsemble {
    /// Feature columns of the regressor for `parameter`.
    pub fn schema_for(parameter: Parameter, features: &FeatureConfig) -> FeatureSchema {
        let mut columns: Vec<String> = CALENDAR_FEATURES.iter().map(|c| c.to_string()).collect();
        columns.extend(features.lags_of(parameter.column_name()));
        FeatureSchema::new(columns)
    }

    /// Fits all regressors in parallel on the training split, recency-weighted.
    pub(crate) fn fit(
        builder: &TrainingSetBuilder,
        features: &FeatureConfig,
        forest: &ForestConfig,
    ) -> Result<Self, TrainingError> {
        let models = Parameter::ENSEMBLE[..]
            .par_iter()
            .map(|&parameter| -> Result<(Parameter, TrainedModel), TrainingError> {
                let set = Self::training_set(builder, parameter, features)?;
                info!("Fitting {} regressor on {} rows", parameter, set.len());
                let model = TrainedModel::fit(
                    ModelTarget::Parameter(parameter),
                    Self::schema_for(parameter, features),
                    &set,
                    Task::Regression,
                    forest,
                )?;
                Ok((parameter, model))
            })
            .collect::<Result<BTreeMap<_, _>, TrainingError>>()?;
        Ok(Self { models })
    }

    /// Recency-weighted training set of the regressor for `parameter`.
    pub(crate) fn training_set(
        builder: &TrainingSetBuilder,
        parameter: Parameter,
        features: &FeatureConfig,
    ) -> Result<TrainingSet, TrainingError> {
        let target = ModelTarget::Parameter(parameter);
        builder.assemble(
            &target.to_string(),
            &Self::schema_for(parameter, features),
            target.column(),
            Weighting::Recency,
        )
    }

    pub fn model(&self, parameter: Parameter) -> Option<&TrainedModel> {
        self.models.get(&parameter)
    }

    pub fn models(&self) -> impl Iterator<Item = &TrainedModel> {
        self.models.values()
    }

    pub fn parameters(&self) -> impl Iterator<Item = Parameter> + '_ {
        self.models.keys().copied()
    }

    /// Union of every member's feature columns.
    pub fn required_columns(&self) -> Vec<String> {
        self.models
            .values()
            .flat_map(|model| model.schema().columns().iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Predicts every member parameter for one feature row, clamped to physical ranges.
    ///
    /// # Errors
    ///
    /// [`ModelError::FeatureMismatch`] or [`ModelError::UndefinedFeature`] naming the first
    /// member whose features are not available.
    pub fn predict_all(&self, row: &FeatureRow) -> Result<BTreeMap<Parameter, f64>, ModelError> {
        self.models
            .iter()
            .map(|(parameter, model)| -> Result<(Parameter, f64), ModelError> {
                Ok((*parameter, parameter.clamp_to_range(model.predict_value(row)?)))
            })
            .collect()
    }

    /// Adds one `{parameter}_pred` column per member to a frame of complete rows.
    pub(crate) fn stack_frame(&self, frame: &mut DataFrame) -> Result<(), ModelError> {
        for (parameter, model) in &self.models {
            let predictions: Vec<f64> = model
                .predict_frame(frame)?
                .into_iter()
                .map(|output| parameter.clamp_to_range(output.first().copied().unwrap_or(f64::NAN)))
                .collect();
            frame
                .with_column(Column::new(parameter.prediction_column().into(), predictions))
                .map_err(|source| ModelError::Polars {
                    model: model.name(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Adds the `{parameter}_pred` values of [`Self::predict_all`] to a feature row.
    pub(crate) fn stack_row(row: &mut FeatureRow, predictions: &BTreeMap<Parameter, f64>) {
        for (parameter, value) in predictions {
            row.insert(parameter.prediction_column(), *value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::engineer::FeatureEngineer;
    use crate::test_support::{fast_training_config, hour, synthetic_table};
    use crate::training::trainer::train;

    #[test]
    fn test_one_regressor_per_ensemble_parameter() -> Result<(), Box<dyn std::error::Error>> {
        let table = synthetic_table(hour(2024, 1, 1, 0), 24 * 10);
        let bundle = train(&table, &fast_training_config())?.bundle;
        let ensemble = bundle.ensemble();

        assert_eq!(
            ensemble.parameters().collect::<BTreeSet<_>>(),
            Parameter::ENSEMBLE.into_iter().collect::<BTreeSet<_>>()
        );
        assert!(ensemble.model(Parameter::Precipitation).is_none());
        for parameter in Parameter::ENSEMBLE {
            let model = ensemble.model(parameter).ok_or("missing regressor")?;
            assert_eq!(
                model.schema(),
                &RegressionEnsemble::schema_for(parameter, bundle.features())
            );
            // Only the member's own lags are inputs.
            let lag = format!("{}_lag1", parameter.column_name());
            assert!(model.schema().columns().contains(&lag));
            assert_eq!(
                model.schema().columns().iter().filter(|c| c.contains("_lag")).count(),
                bundle.features().max_lag
            );
        }
        Ok(())
    }

    #[test]
    fn test_missing_lag_names_the_member() -> Result<(), Box<dyn std::error::Error>> {
        let table = synthetic_table(hour(2024, 1, 1, 0), 24 * 10);
        let bundle = train(&table, &fast_training_config())?.bundle;
        let frame = FeatureEngineer::new(bundle.features().clone())?.engineer(&table)?;

        let mut row = FeatureRow::from_frame(&frame, 5)?;
        assert_eq!(bundle.ensemble().predict_all(&row)?.len(), 6);

        row.remove("temperature_lag1");
        assert!(matches!(
            bundle.ensemble().predict_all(&row),
            Err(ModelError::FeatureMismatch { model, column })
                if model == "temperature" && column == "temperature_lag1"
        ));
        Ok(())
    }
}
