use crate::features::schema::{FeatureRow, FeatureSchema};
use crate::models::error::ModelError;
use crate::models::forest::{ForestConfig, RandomForest};
use crate::models::tree::Task;
use crate::training::training_set::TrainingSet;
use crate::types::weather_record::{Parameter, WEATHER_CODE_COLUMN};
use ndarray::Array2;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The quantity a [`TrainedModel`] predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelTarget {
    Parameter(Parameter),
    WeatherCode,
}

impl ModelTarget {
    /// Column holding the training target.
    pub fn column(&self) -> &'static str {
        match self {
            ModelTarget::Parameter(parameter) => parameter.column_name(),
            ModelTarget::WeatherCode => WEATHER_CODE_COLUMN,
        }
    }
}

impl fmt::Display for ModelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelTarget::Parameter(parameter) => write!(f, "{}", parameter),
            ModelTarget::WeatherCode => write!(f, "classifier"),
        }
    }
}

/// A fitted forest together with the schema it was fit on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    target: ModelTarget,
    schema: FeatureSchema,
    forest: RandomForest,
}

impl TrainedModel {
    pub(crate) fn fit(
        target: ModelTarget,
        schema: FeatureSchema,
        set: &TrainingSet,
        task: Task,
        config: &ForestConfig,
    ) -> Result<Self, ModelError> {
        let forest = RandomForest::fit(
            &target.to_string(),
            set.features().view(),
            set.targets().view(),
            set.weights().view(),
            task,
            config,
        )?;
        Ok(Self {
            target,
            schema,
            forest,
        })
    }

    pub fn target(&self) -> ModelTarget {
        self.target
    }

    /// Name used in errors and reports, e.g. `temperature` or `classifier`.
    pub fn name(&self) -> String {
        self.target.to_string()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Raw forest output for one feature row.
    pub fn predict_row(&self, row: &FeatureRow) -> Result<Vec<f64>, ModelError> {
        let vector = self.schema.vector(&self.name(), row)?;
        Ok(self.forest.predict_row(&vector))
    }

    /// First output of [`Self::predict_row`], the value of a regression model.
    pub fn predict_value(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        Ok(self.predict_row(row)?.first().copied().unwrap_or(f64::NAN))
    }

    /// Raw forest output for every row of a feature matrix laid out in schema order.
    pub fn predict_matrix(&self, x: &Array2<f64>) -> Vec<Vec<f64>> {
        x.rows()
            .into_iter()
            .map(|row| self.forest.predict_row(&row.to_vec()))
            .collect()
    }

    /// Raw forest output for every row of a frame without nulls in the schema columns.
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Vec<Vec<f64>>, ModelError> {
        let x = self.schema.matrix(&self.name(), df)?;
        Ok(self.predict_matrix(&x))
    }
}
