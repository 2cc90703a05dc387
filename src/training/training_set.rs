//! Time-based train/holdout splitting and assembly of `(X, y, w)` training sets.

use crate::features::engineer::SAMPLE_WEIGHT_COLUMN;
use crate::features::schema::FeatureSchema;
use crate::models::error::ModelError;
use crate::training::error::TrainingError;
use crate::types::weather_record::TIME_COLUMN;
use crate::utils::float_values;
use chrono::{DateTime, Months, Utc};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Where the chronological holdout boundary lies.
///
/// Rows strictly before the cutoff are used for fitting, rows at or after it for
/// evaluation. A history that does not reach back past the cutoff leaves no training
/// rows, and training fails with [`TrainingError::DataInsufficiency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Holdout {
    /// Cutoff this many years before the latest observation.
    YearsBeforeLatest(u32),
    /// A fixed cutoff instant.
    At(DateTime<Utc>),
    /// Fit on everything; no holdout scores are produced.
    Disabled,
}

impl Default for Holdout {
    fn default() -> Self {
        Holdout::YearsBeforeLatest(5)
    }
}

impl Holdout {
    /// Resolves the cutoff instant relative to the latest observation.
    pub fn cutoff(&self, latest: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Holdout::YearsBeforeLatest(years) => {
                latest.checked_sub_months(Months::new(years.saturating_mul(12)))
            }
            Holdout::At(cutoff) => Some(*cutoff),
            Holdout::Disabled => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Holdout,
}

/// How rows of a [`TrainingSet`] are weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weighting {
    /// The engineered `sample_weight` column.
    Recency,
    /// Every row weighs 1.
    Uniform,
}

/// A model-ready training set: feature matrix, targets and sample weights.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    x: Array2<f64>,
    y: Array1<f64>,
    weights: Array1<f64>,
}

impl TrainingSet {
    /// Assembles a training set from the rows of `frame` in which every schema column, the
    /// target and (for [`Weighting::Recency`]) the weight are defined.
    ///
    /// # Errors
    ///
    /// [`TrainingError::DataInsufficiency`] if no such row exists.
    pub fn from_frame(
        model: &str,
        frame: &DataFrame,
        schema: &FeatureSchema,
        target: &str,
        weighting: Weighting,
    ) -> Result<Self, TrainingError> {
        Self::try_from_frame(model, frame, schema, target, weighting)?.ok_or_else(|| {
            TrainingError::DataInsufficiency {
                model: model.to_string(),
            }
        })
    }

    /// Like [`Self::from_frame`], but an empty result is `Ok(None)`.
    pub fn try_from_frame(
        model: &str,
        frame: &DataFrame,
        schema: &FeatureSchema,
        target: &str,
        weighting: Weighting,
    ) -> Result<Option<Self>, TrainingError> {
        let mut required = schema.columns().to_vec();
        required.push(target.to_string());
        if weighting == Weighting::Recency {
            required.push(SAMPLE_WEIGHT_COLUMN.to_string());
        }
        if let Some(missing) = required
            .iter()
            .find(|column| frame.get_column_index(column).is_none())
        {
            return Err(ModelError::FeatureMismatch {
                model: model.to_string(),
                column: missing.clone(),
            }
            .into());
        }

        let complete = complete_rows(frame, &required).map_err(|source| TrainingError::Polars {
            stage: format!("selecting complete rows for '{model}'"),
            source,
        })?;
        if complete.height() == 0 {
            return Ok(None);
        }

        let x = schema.matrix(model, &complete)?;
        let column = |name: &str| -> Result<Array1<f64>, TrainingError> {
            let values = float_values(&complete, name).map_err(|source| TrainingError::Polars {
                stage: format!("reading column '{name}' for '{model}'"),
                source,
            })?;
            Ok(values.into_iter().flatten().collect())
        };
        let y = column(target)?;
        let weights = match weighting {
            Weighting::Recency => column(SAMPLE_WEIGHT_COLUMN)?,
            Weighting::Uniform => Array1::ones(complete.height()),
        };
        Ok(Some(Self { x, y, weights }))
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.x
    }

    pub fn targets(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Replaces targets and weights, e.g. after mapping class labels to indices.
    pub(crate) fn with_targets(self, y: Array1<f64>, weights: Array1<f64>) -> Self {
        Self {
            x: self.x,
            y,
            weights,
        }
    }
}

/// Rows of `frame` in which none of `columns` is null.
pub(crate) fn complete_rows(frame: &DataFrame, columns: &[String]) -> PolarsResult<DataFrame> {
    let Some(predicate) = columns
        .iter()
        .map(|column| col(column.as_str()).is_not_null())
        .reduce(|acc, expr| acc.and(expr))
    else {
        return Ok(frame.clone());
    };
    frame.clone().lazy().filter(predicate).collect()
}

/// Splits an engineered feature frame chronologically and assembles per-model sets.
#[derive(Debug, Clone)]
pub struct TrainingSetBuilder {
    train: DataFrame,
    holdout: DataFrame,
    cutoff: Option<DateTime<Utc>>,
}

impl TrainingSetBuilder {
    /// Splits `features` at `cutoff`; without a cutoff every row is a training row.
    pub fn new(features: DataFrame, cutoff: Option<DateTime<Utc>>) -> Result<Self, TrainingError> {
        let Some(cutoff) = cutoff else {
            let holdout = features.clear();
            return Ok(Self {
                train: features,
                holdout,
                cutoff: None,
            });
        };

        let split = |frame: LazyFrame, predicate: Expr| {
            frame
                .filter(predicate)
                .collect()
                .map_err(|source| TrainingError::Polars {
                    stage: format!("splitting features at {cutoff}"),
                    source,
                })
        };
        let boundary = lit(cutoff.naive_utc());
        let train = split(features.clone().lazy(), col(TIME_COLUMN).lt(boundary.clone()))?;
        let holdout = split(features.lazy(), col(TIME_COLUMN).gt_eq(boundary))?;
        Ok(Self {
            train,
            holdout,
            cutoff: Some(cutoff),
        })
    }

    pub fn cutoff(&self) -> Option<DateTime<Utc>> {
        self.cutoff
    }

    pub fn frame(&self, split: Split) -> &DataFrame {
        match split {
            Split::Train => &self.train,
            Split::Holdout => &self.holdout,
        }
    }

    /// Training set of `model` from the training split.
    pub fn assemble(
        &self,
        model: &str,
        schema: &FeatureSchema,
        target: &str,
        weighting: Weighting,
    ) -> Result<TrainingSet, TrainingError> {
        TrainingSet::from_frame(model, &self.train, schema, target, weighting)
    }

    /// Evaluation set of `model` from the holdout split, if it has any complete rows.
    pub fn assemble_holdout(
        &self,
        model: &str,
        schema: &FeatureSchema,
        target: &str,
    ) -> Result<Option<TrainingSet>, TrainingError> {
        TrainingSet::try_from_frame(model, &self.holdout, schema, target, Weighting::Uniform)
    }

    /// Rows of a split with every listed column defined.
    pub fn complete_rows(&self, split: Split, columns: &[String]) -> Result<DataFrame, TrainingError> {
        complete_rows(self.frame(split), columns).map_err(|source| TrainingError::Polars {
            stage: "selecting complete rows".to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::engineer::{FeatureConfig, FeatureEngineer};
    use crate::test_support::{hour, synthetic_table};

    fn features(hours: usize) -> DataFrame {
        let table = synthetic_table(hour(2023, 12, 31, 0), hours);
        FeatureEngineer::new(FeatureConfig::builder().max_lag(2).center_year(2024).build())
            .and_then(|fe| fe.engineer(&table))
            .expect("features")
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec![
            "hour".to_string(),
            "temperature_lag1".to_string(),
            "temperature_lag2".to_string(),
        ])
    }

    #[test]
    fn test_holdout_cutoff() {
        let latest = hour(2025, 1, 1, 0);
        assert_eq!(Holdout::default().cutoff(latest), Some(hour(2020, 1, 1, 0)));
        assert_eq!(
            Holdout::At(hour(2024, 6, 1, 0)).cutoff(latest),
            Some(hour(2024, 6, 1, 0))
        );
        assert_eq!(Holdout::Disabled.cutoff(latest), None);
    }

    #[test]
    fn test_split_is_chronological() -> Result<(), Box<dyn std::error::Error>> {
        let builder = TrainingSetBuilder::new(features(48), Some(hour(2024, 1, 1, 0)))?;
        assert_eq!(builder.frame(Split::Train).height(), 24);
        assert_eq!(builder.frame(Split::Holdout).height(), 24);

        let all = TrainingSetBuilder::new(features(48), None)?;
        assert_eq!(all.frame(Split::Train).height(), 48);
        assert_eq!(all.frame(Split::Holdout).height(), 0);
        Ok(())
    }

    #[test]
    fn test_incomplete_rows_are_dropped() -> Result<(), Box<dyn std::error::Error>> {
        let builder = TrainingSetBuilder::new(features(24), None)?;
        let set = builder.assemble("temperature", &schema(), "temperature", Weighting::Recency)?;
        // Two leading rows lack lag2.
        assert_eq!(set.len(), 22);
        assert_eq!(set.features().dim(), (22, 3));
        assert_eq!(set.features()[[0, 0]], 2.0);
        // Every row is in 2023, one year before the center year.
        assert!(set.weights().iter().all(|w| (w - (-0.5f64).exp()).abs() < 1e-12));

        let uniform = builder.assemble("temperature", &schema(), "temperature", Weighting::Uniform)?;
        assert!(uniform.weights().iter().all(|w| *w == 1.0));
        Ok(())
    }

    #[test]
    fn test_empty_training_set_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let builder = TrainingSetBuilder::new(features(2), None)?;
        assert!(matches!(
            builder.assemble("temperature", &schema(), "temperature", Weighting::Uniform),
            Err(TrainingError::DataInsufficiency { model }) if model == "temperature"
        ));
        assert!(builder
            .assemble_holdout("temperature", &schema(), "temperature")?
            .is_none());
        Ok(())
    }

    #[test]
    fn test_missing_target_column() -> Result<(), Box<dyn std::error::Error>> {
        let builder = TrainingSetBuilder::new(features(24), None)?;
        assert!(matches!(
            builder.assemble("x", &schema(), "visibility", Weighting::Uniform),
            Err(TrainingError::Model(ModelError::FeatureMismatch { column, .. })) if column == "visibility"
        ));
        Ok(())
    }
}
