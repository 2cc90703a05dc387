use crate::features::engineer::{FeatureConfig, CALENDAR_FEATURES};
use crate::features::schema::{FeatureRow, FeatureSchema};
use crate::models::error::ModelError;
use crate::models::forest::ForestConfig;
use crate::models::regression_ensemble::RegressionEnsemble;
use crate::models::trained_model::{ModelTarget, TrainedModel};
use crate::models::tree::Task;
use crate::training::error::TrainingError;
use crate::training::training_set::{Split, TrainingSet, TrainingSetBuilder, Weighting};
use crate::types::weather_record::{Parameter, WEATHER_CODE_COLUMN};
use log::info;
use ndarray::Array1;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Predicts the WMO weather code of an hour.
///
/// Inputs are the calendar features, the lags of the weather code and of precipitation,
/// and the regression ensemble's predictions for the same hour (`{parameter}_pred`).
/// At training time those predictions are the ensemble's in-sample outputs, so the
/// classifier learns from inputs shaped like the ones it will see when forecasting.
///
/// Rare codes would otherwise be drowned out by clear sky, so every training row of
/// class `c` is weighted `n / (k · count(c))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCodeClassifier {
    model: TrainedModel,
    /// Observed codes in ascending order; the forest predicts indices into this list.
    classes: Vec<i32>,
}

impl WeatherCodeClassifier {
    pub fn schema(features: &FeatureConfig) -> FeatureSchema {
        let mut columns: Vec<String> = CALENDAR_FEATURES.iter().map(|c| c.to_string()).collect();
        columns.extend(features.lags_of(WEATHER_CODE_COLUMN));
        columns.extend(features.lags_of(Parameter::Precipitation.column_name()));
        columns.extend(Parameter::ENSEMBLE.iter().map(Parameter::prediction_column));
        FeatureSchema::new(columns)
    }

    pub(crate) fn fit(
        builder: &TrainingSetBuilder,
        ensemble: &RegressionEnsemble,
        features: &FeatureConfig,
        forest: &ForestConfig,
    ) -> Result<Self, TrainingError> {
        let schema = Self::schema(features);
        let target = ModelTarget::WeatherCode;
        let name = target.to_string();

        let frame = Self::stacked_frame(builder, Split::Train, ensemble, &schema)?;
        let set = TrainingSet::from_frame(&name, &frame, &schema, target.column(), Weighting::Uniform)?;

        let codes: Vec<i32> = set.targets().iter().map(|code| *code as i32).collect();
        let classes: Vec<i32> = codes.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let index: BTreeMap<i32, usize> = classes.iter().enumerate().map(|(i, c)| (*c, i)).collect();
        let labels: Vec<usize> = codes.iter().map(|code| index[code]).collect();

        let weights = balanced_class_weights(&labels, classes.len());
        let labels: Array1<f64> = labels.iter().map(|l| *l as f64).collect();
        let set = set.with_targets(labels, weights);

        info!(
            "Fitting weather code classifier on {} rows across {} classes",
            set.len(),
            classes.len()
        );
        let model = TrainedModel::fit(
            target,
            schema,
            &set,
            Task::Classification {
                n_classes: classes.len(),
            },
            forest,
        )?;
        Ok(Self { model, classes })
    }

    /// Complete rows of a split with the ensemble predictions appended.
    ///
    /// Rows are kept only when both the ensemble members and the classifier's own
    /// non-stacked features are defined.
    pub(crate) fn stacked_frame(
        builder: &TrainingSetBuilder,
        split: Split,
        ensemble: &RegressionEnsemble,
        schema: &FeatureSchema,
    ) -> Result<DataFrame, TrainingError> {
        let predicted: BTreeSet<String> =
            Parameter::ENSEMBLE.iter().map(Parameter::prediction_column).collect();
        let mut required: BTreeSet<String> = ensemble.required_columns().into_iter().collect();
        required.extend(
            schema
                .columns()
                .iter()
                .filter(|column| !predicted.contains(*column))
                .cloned(),
        );
        required.insert(WEATHER_CODE_COLUMN.to_string());

        let required: Vec<String> = required.into_iter().collect();
        let mut frame = builder.complete_rows(split, &required)?;
        if frame.height() > 0 {
            ensemble.stack_frame(&mut frame)?;
        }
        Ok(frame)
    }

    /// The most probable weather code for a row that already carries the `_pred` columns.
    pub fn predict(&self, row: &FeatureRow) -> Result<i32, ModelError> {
        let probabilities = self.model.predict_row(row)?;
        Ok(self.classes[argmax(&probabilities)])
    }

    /// Class probabilities keyed by weather code.
    pub fn predict_proba(&self, row: &FeatureRow) -> Result<BTreeMap<i32, f64>, ModelError> {
        let probabilities = self.model.predict_row(row)?;
        Ok(self.classes.iter().copied().zip(probabilities).collect())
    }

    /// Most probable code for every row of a stacked frame.
    pub(crate) fn predict_frame(&self, frame: &DataFrame) -> Result<Vec<i32>, ModelError> {
        Ok(self
            .model
            .predict_frame(frame)?
            .iter()
            .map(|probabilities| self.classes[argmax(probabilities)])
            .collect())
    }

    pub fn classes(&self) -> &[i32] {
        &self.classes
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }
}

/// Index of the largest value; the first one wins ties.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = i;
        }
    }
    best
}

/// `n / (k · count(c))` for each label, where `k` is the number of classes.
pub(crate) fn balanced_class_weights(labels: &[usize], n_classes: usize) -> Array1<f64> {
    let mut counts = vec![0usize; n_classes];
    for label in labels {
        counts[*label] += 1;
    }
    let n = labels.len() as f64;
    labels
        .iter()
        .map(|label| n / (n_classes as f64 * counts[*label] as f64))
        .collect()
}
