//! Output types of the forecaster: rows tagged with their provenance and the working table
//! that the recursive procedure extends.

use crate::types::error::TableError;
use crate::types::weather_record::WeatherRecord;
use crate::types::weather_table::{records_to_frame, WeatherTable};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the provenance column added by [`ForecastTable::to_frame`].
pub const PROVENANCE_COLUMN: &str = "provenance";

/// Whether a row was copied from history or produced by the models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Observed,
    Predicted,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Observed => write!(f, "observed"),
            Provenance::Predicted => write!(f, "predicted"),
        }
    }
}

/// A [`WeatherRecord`] plus the marker telling observed rows from predicted ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    #[serde(flatten)]
    pub record: WeatherRecord,
    pub provenance: Provenance,
}

impl ForecastRow {
    pub fn observed(record: WeatherRecord) -> Self {
        Self {
            record,
            provenance: Provenance::Observed,
        }
    }

    pub fn predicted(record: WeatherRecord) -> Self {
        Self {
            record,
            provenance: Provenance::Predicted,
        }
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.record.time
    }

    pub fn is_predicted(&self) -> bool {
        self.provenance == Provenance::Predicted
    }
}

/// The working table of a forecast: observed history followed by any predicted rows.
///
/// A `ForecastTable` is created from a [`WeatherTable`] (every row observed) and is
/// extended by [`crate::Forecaster::forecast`], which returns the extended copy. Passing
/// that copy back into a later call lets already predicted hours be reused instead of
/// recomputed.
///
/// Serialized as a plain sequence of rows; deserialization goes through
/// [`ForecastTable::from_rows`] and rejects unordered input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<ForecastRow>", into = "Vec<ForecastRow>")]
pub struct ForecastTable {
    rows: Vec<ForecastRow>,
}

impl ForecastTable {
    /// Builds a table from rows that are already in strictly increasing time order.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Unordered`] if two consecutive rows are not strictly increasing.
    pub fn from_rows(rows: Vec<ForecastRow>) -> Result<Self, TableError> {
        if let Some(pair) = rows.windows(2).find(|pair| pair[0].time() >= pair[1].time()) {
            return Err(TableError::Unordered(pair[1].time()));
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Timestamp of the most recent observed row; horizons are measured from here.
    pub fn latest_observed(&self) -> Option<DateTime<Utc>> {
        self.rows
            .iter()
            .rev()
            .find(|row| row.provenance == Provenance::Observed)
            .map(ForecastRow::time)
    }

    pub fn get(&self, time: DateTime<Utc>) -> Option<&ForecastRow> {
        self.rows
            .binary_search_by_key(&time, ForecastRow::time)
            .ok()
            .map(|idx| &self.rows[idx])
    }

    /// Iterates over the predicted rows only.
    pub fn predicted(&self) -> impl Iterator<Item = &ForecastRow> {
        self.rows.iter().filter(|row| row.is_predicted())
    }

    /// The last `count` rows strictly before `time`, oldest first.
    pub(crate) fn rows_before(&self, time: DateTime<Utc>, count: usize) -> &[ForecastRow] {
        let end = self.rows.partition_point(|row| row.time() < time);
        &self.rows[end.saturating_sub(count)..end]
    }

    /// Inserts a row at its sorted position. An existing row at the same hour is kept.
    pub(crate) fn insert(&mut self, row: ForecastRow) -> bool {
        match self.rows.binary_search_by_key(&row.time(), ForecastRow::time) {
            Ok(_) => false,
            Err(idx) => {
                self.rows.insert(idx, row);
                true
            }
        }
    }

    /// Converts the table into a `DataFrame` with the observation columns plus a
    /// string `provenance` column.
    pub fn to_frame(&self) -> Result<DataFrame, TableError> {
        let records: Vec<WeatherRecord> = self.rows.iter().map(|row| row.record.clone()).collect();
        let provenance: Vec<String> = self.rows.iter().map(|row| row.provenance.to_string()).collect();
        let mut df = records_to_frame(&records).map_err(TableError::FrameBuild)?;
        df.with_column(Column::new(PROVENANCE_COLUMN.into(), provenance))
            .map_err(TableError::FrameBuild)?;
        Ok(df)
    }
}

impl From<&WeatherTable> for ForecastTable {
    fn from(table: &WeatherTable) -> Self {
        Self {
            rows: table
                .records()
                .iter()
                .cloned()
                .map(ForecastRow::observed)
                .collect(),
        }
    }
}

impl TryFrom<Vec<ForecastRow>> for ForecastTable {
    type Error = TableError;

    fn try_from(rows: Vec<ForecastRow>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<ForecastTable> for Vec<ForecastRow> {
    fn from(table: ForecastTable) -> Self {
        table.rows
    }
}

impl From<WeatherTable> for ForecastTable {
    fn from(table: WeatherTable) -> Self {
        Self::from(&table)
    }
}
