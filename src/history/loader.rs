//! Reads the observation history file kept by the data collector.
//!
//! The collector writes Open-Meteo "current" snapshots with unit-suffixed headers such as
//! `temperature_2m (°C)`. Those headers are mapped onto the canonical column names;
//! files that already use canonical names are accepted as they are. Columns not needed
//! for forecasting (e.g. `rain (mm)`) are ignored.

use crate::history::error::HistoryError;
use crate::types::weather_record::{
    Parameter, WeatherRecord, IS_DAY_COLUMN, TIME_COLUMN, WEATHER_CODE_COLUMN,
};
use crate::types::weather_table::WeatherTable;
use crate::utils::float_values;
use chrono::{DateTime, NaiveDateTime, Utc};
use log::info;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tokio::task;

/// Collector header → canonical column name.
pub const HISTORY_COLUMNS: [(&str, &str); 9] = [
    ("temperature_2m (°C)", "temperature"),
    ("relative_humidity_2m (%)", "humidity"),
    ("wind_direction_10m (°)", "wind_direction"),
    ("wind_speed_10m (km/h)", "wind_speed"),
    ("cloud_cover (%)", "cloud_cover"),
    ("surface_pressure (hPa)", "surface_pressure"),
    ("precipitation (mm)", "precipitation"),
    ("weather_code (wmo code)", WEATHER_CODE_COLUMN),
    ("is_day ()", IS_DAY_COLUMN),
];

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Reads a history CSV into a validated [`WeatherTable`].
///
/// Naive timestamps are interpreted as UTC.
///
/// # Errors
///
/// * [`HistoryError::CsvRead`] if the file cannot be read or parsed as CSV.
/// * [`HistoryError::MissingColumn`] / [`HistoryError::MissingValue`] for absent data.
/// * [`HistoryError::InvalidTimestamp`] for an unparseable `time` cell.
/// * [`HistoryError::Table`] for duplicate or non-hourly timestamps.
pub fn read_history_csv(path: &Path) -> Result<WeatherTable, HistoryError> {
    let csv_error = |source| HistoryError::CsvRead {
        path: path.to_path_buf(),
        source,
    };
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(csv_error)?
        .finish()
        .map_err(csv_error)?;

    let table = history_from_frame(&df)?;
    info!(
        "Loaded {} hourly observations from {}",
        table.len(),
        path.display()
    );
    Ok(table)
}

/// Async wrapper around [`read_history_csv`] that parses on the blocking thread pool.
pub async fn load_history_csv(path: impl AsRef<Path>) -> Result<WeatherTable, HistoryError> {
    let path: PathBuf = path.as_ref().to_path_buf();
    task::spawn_blocking(move || read_history_csv(&path)).await?
}

/// Converts an already loaded history frame into a [`WeatherTable`].
pub fn history_from_frame(df: &DataFrame) -> Result<WeatherTable, HistoryError> {
    let df = canonicalize_columns(df)?;
    let times = timestamps(&df)?;

    let mut parameters = Vec::with_capacity(Parameter::ALL.len());
    for parameter in Parameter::ALL {
        parameters.push((parameter, required_floats(&df, parameter.column_name())?));
    }
    let codes = required_floats(&df, WEATHER_CODE_COLUMN)?;
    let is_day = match df.get_column_index(IS_DAY_COLUMN) {
        Some(_) => Some(float_values(&df, IS_DAY_COLUMN)?),
        None => None,
    };

    let value = |column: &str, values: &[Option<f64>], row: usize| {
        values[row].ok_or_else(|| HistoryError::MissingValue {
            column: column.to_string(),
            row,
        })
    };

    let mut records = Vec::with_capacity(df.height());
    for (row, time) in times.into_iter().enumerate() {
        let mut record = WeatherRecord {
            time,
            temperature: 0.0,
            humidity: 0.0,
            wind_direction: 0.0,
            wind_speed: 0.0,
            cloud_cover: 0.0,
            surface_pressure: 0.0,
            precipitation: 0.0,
            weather_code: value(WEATHER_CODE_COLUMN, &codes, row)? as i32,
            is_day: is_day
                .as_ref()
                .and_then(|flags| flags[row])
                .map(|flag| flag != 0.0),
        };
        for (parameter, values) in &parameters {
            record.set_value(*parameter, value(parameter.column_name(), values, row)?);
        }
        records.push(record);
    }

    Ok(WeatherTable::new(records)?)
}

fn canonicalize_columns(df: &DataFrame) -> Result<DataFrame, HistoryError> {
    let mut df = df.clone();
    for (header, canonical) in HISTORY_COLUMNS {
        if df.get_column_index(header).is_some() && df.get_column_index(canonical).is_none() {
            df.rename(header, canonical.into())?;
        }
    }
    Ok(df)
}

fn required_floats(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>, HistoryError> {
    if df.get_column_index(column).is_none() {
        return Err(HistoryError::MissingColumn(column.to_string()));
    }
    Ok(float_values(df, column)?)
}

fn timestamps(df: &DataFrame) -> Result<Vec<DateTime<Utc>>, HistoryError> {
    let column = df
        .column(TIME_COLUMN)
        .map_err(|_| HistoryError::MissingColumn(TIME_COLUMN.to_string()))?;

    match column.dtype() {
        DataType::String => column
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                let value = value.ok_or_else(|| HistoryError::MissingValue {
                    column: TIME_COLUMN.to_string(),
                    row,
                })?;
                parse_timestamp(value).ok_or_else(|| HistoryError::InvalidTimestamp {
                    row,
                    value: value.to_string(),
                })
            })
            .collect(),
        DataType::Datetime(_, _) | DataType::Date => {
            let millis = column
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                .cast(&DataType::Int64)?;
            millis
                .i64()?
                .into_iter()
                .enumerate()
                .map(|(row, value)| {
                    value
                        .and_then(DateTime::from_timestamp_millis)
                        .ok_or_else(|| HistoryError::MissingValue {
                            column: TIME_COLUMN.to_string(),
                            row,
                        })
                })
                .collect()
        }
        other => Err(HistoryError::UnsupportedColumnType {
            column: TIME_COLUMN.to_string(),
            dtype: other.to_string(),
        }),
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(aware) = DateTime::parse_from_rfc3339(value) {
        return Some(aware.with_timezone(&Utc));
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}
