//! Versioned feature schemas and single-row feature vectors.
//!
//! Every trained model carries the exact, ordered list of columns it was fit on. The
//! schema is checked whenever the model is asked to predict, so a missing column is
//! reported by name as [`ModelError::FeatureMismatch`] instead of surfacing as a shape
//! error deep inside the learner.

use crate::features::error::FeatureError;
use crate::models::error::ModelError;
use crate::types::weather_record::TIME_COLUMN;
use crate::utils::float_values;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the feature layout. Bumped whenever column naming or derivation changes so
/// that persisted models built against an older layout are refused.
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// The ordered list of feature columns a model requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    version: u32,
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            version: FEATURE_SCHEMA_VERSION,
            columns,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Fails with the first schema column that `df` does not have.
    pub fn check_frame(&self, model: &str, df: &DataFrame) -> Result<(), ModelError> {
        match self
            .columns
            .iter()
            .find(|column| df.get_column_index(column).is_none())
        {
            Some(column) => Err(ModelError::FeatureMismatch {
                model: model.to_string(),
                column: column.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Builds the feature vector of one row, in schema order.
    ///
    /// # Errors
    ///
    /// * [`ModelError::FeatureMismatch`] if the row has no such column.
    /// * [`ModelError::UndefinedFeature`] if the column is present but null (e.g. a lag
    ///   reaching before the start of history).
    pub fn vector(&self, model: &str, row: &FeatureRow) -> Result<Vec<f64>, ModelError> {
        self.columns
            .iter()
            .map(|column| match row.get(column) {
                None => Err(ModelError::FeatureMismatch {
                    model: model.to_string(),
                    column: column.clone(),
                }),
                Some(None) => Err(ModelError::UndefinedFeature {
                    model: model.to_string(),
                    column: column.clone(),
                }),
                Some(Some(value)) => Ok(value),
            })
            .collect()
    }

    /// Builds the `(rows × columns)` feature matrix of a frame, in schema order.
    ///
    /// Null cells are reported as [`ModelError::UndefinedFeature`]; callers drop
    /// incomplete rows beforehand.
    pub fn matrix(&self, model: &str, df: &DataFrame) -> Result<Array2<f64>, ModelError> {
        self.check_frame(model, df)?;
        let mut x = Array2::zeros((df.height(), self.columns.len()));
        for (j, column) in self.columns.iter().enumerate() {
            let values = float_values(df, column).map_err(|source| ModelError::Polars {
                model: model.to_string(),
                source,
            })?;
            for (i, value) in values.into_iter().enumerate() {
                x[[i, j]] = value.ok_or_else(|| ModelError::UndefinedFeature {
                    model: model.to_string(),
                    column: column.clone(),
                })?;
            }
        }
        Ok(x)
    }
}

/// One engineered row lifted out of a feature frame.
///
/// Values are keyed by column name; `None` marks an undefined value such as a lag that
/// reaches before the start of history.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    time: DateTime<Utc>,
    values: BTreeMap<String, Option<f64>>,
}

impl FeatureRow {
    /// Extracts row `index` of an engineered frame. Every column except `time` is read
    /// as `f64`.
    pub fn from_frame(df: &DataFrame, index: usize) -> Result<Self, FeatureError> {
        if index >= df.height() {
            return Err(FeatureError::RowOutOfBounds {
                index,
                height: df.height(),
            });
        }
        let millis = df.column(TIME_COLUMN)?.cast(&DataType::Int64)?;
        let time = millis
            .i64()?
            .get(index)
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| {
                FeatureError::Polars(PolarsError::ComputeError(
                    format!("row {index} has no valid timestamp").into(),
                ))
            })?;

        let mut values = BTreeMap::new();
        for column in df.get_columns() {
            let name = column.name().as_str();
            if name == TIME_COLUMN {
                continue;
            }
            let cast = column.cast(&DataType::Float64)?;
            values.insert(name.to_string(), cast.f64()?.get(index));
        }
        Ok(Self { time, values })
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// `None` if the column is absent, `Some(None)` if it is present but undefined.
    pub fn get(&self, column: &str) -> Option<Option<f64>> {
        self.values.get(column).copied()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: f64) {
        self.values.insert(column.into(), Some(value));
    }

    pub fn remove(&mut self, column: &str) -> Option<Option<f64>> {
        self.values.remove(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}
