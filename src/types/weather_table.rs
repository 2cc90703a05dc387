//! Contains `WeatherTable`, the validated, time-ordered table of hourly observations that
//! every training run and forecast starts from.

use crate::types::error::TableError;
use crate::types::weather_record::{
    Parameter, WeatherRecord, IS_DAY_COLUMN, TIME_COLUMN, WEATHER_CODE_COLUMN,
};
use crate::utils::is_hour_aligned;
use chrono::{DateTime, Utc};
use polars::prelude::*;

/// A table of hourly weather observations, sorted ascending by time.
///
/// Construction via [`WeatherTable::new`] enforces the table invariants:
/// timestamps are unique and aligned to the start of an hour. Gaps between hours
/// are permitted and are never filled implicitly.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use weathercast::{WeatherRecord, WeatherTable};
///
/// let record = |hour| WeatherRecord {
///     time: Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap(),
///     temperature: 14.0,
///     humidity: 80.0,
///     wind_direction: 270.0,
///     wind_speed: 6.5,
///     cloud_cover: 20.0,
///     surface_pressure: 1012.0,
///     precipitation: 0.0,
///     weather_code: 1,
///     is_day: Some(false),
/// };
///
/// // Input order does not matter, the table is sorted on construction.
/// let table = WeatherTable::new(vec![record(2), record(0), record(1)]).unwrap();
/// assert_eq!(table.len(), 3);
/// assert_eq!(table.latest().unwrap().time, Utc.with_ymd_and_hms(2025, 1, 1, 2, 0, 0).unwrap());
///
/// // Duplicate hours are rejected.
/// assert!(WeatherTable::new(vec![record(0), record(0)]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherTable {
    records: Vec<WeatherRecord>,
}

impl WeatherTable {
    /// Sorts and validates `records` into a table.
    ///
    /// # Errors
    ///
    /// * [`TableError::UnalignedTimestamp`] if a timestamp has non-zero minutes, seconds or nanoseconds.
    /// * [`TableError::DuplicateTimestamp`] if two records share a timestamp.
    pub fn new(mut records: Vec<WeatherRecord>) -> Result<Self, TableError> {
        if let Some(record) = records.iter().find(|r| !is_hour_aligned(&r.time)) {
            return Err(TableError::UnalignedTimestamp(record.time));
        }
        records.sort_by_key(|r| r.time);
        if let Some(pair) = records.windows(2).find(|pair| pair[0].time == pair[1].time) {
            return Err(TableError::DuplicateTimestamp(pair[1].time));
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[WeatherRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The most recent observation, if any.
    pub fn latest(&self) -> Option<&WeatherRecord> {
        self.records.last()
    }

    /// Looks up the observation at exactly `time`.
    pub fn get(&self, time: DateTime<Utc>) -> Option<&WeatherRecord> {
        self.records
            .binary_search_by_key(&time, |r| r.time)
            .ok()
            .map(|idx| &self.records[idx])
    }

    /// Converts the table into a Polars `DataFrame`.
    ///
    /// The frame has a timezone-naive `time` column (`Datetime(Milliseconds)`, UTC),
    /// one `f64` column per [`Parameter`], an `i32` `weather_code` column and a
    /// nullable boolean `is_day` column.
    pub fn to_frame(&self) -> Result<DataFrame, TableError> {
        records_to_frame(&self.records).map_err(TableError::FrameBuild)
    }
}

impl TryFrom<Vec<WeatherRecord>> for WeatherTable {
    type Error = TableError;

    fn try_from(records: Vec<WeatherRecord>) -> Result<Self, Self::Error> {
        Self::new(records)
    }
}

/// Builds the canonical observation frame from already ordered records.
pub(crate) fn records_to_frame(records: &[WeatherRecord]) -> PolarsResult<DataFrame> {
    let millis: Vec<i64> = records.iter().map(|r| r.time.timestamp_millis()).collect();
    let time = Column::new(TIME_COLUMN.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

    let mut columns = Vec::with_capacity(Parameter::ALL.len() + 3);
    columns.push(time);
    for parameter in Parameter::ALL {
        let values: Vec<f64> = records.iter().map(|r| r.value(parameter)).collect();
        columns.push(Column::new(parameter.column_name().into(), values));
    }
    let codes: Vec<i32> = records.iter().map(|r| r.weather_code).collect();
    columns.push(Column::new(WEATHER_CODE_COLUMN.into(), codes));
    let is_day: Vec<Option<bool>> = records.iter().map(|r| r.is_day).collect();
    columns.push(Column::new(IS_DAY_COLUMN.into(), is_day));

    DataFrame::new(columns)
}
