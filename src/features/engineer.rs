//! Contains the `FeatureEngineer`, which derives temporal, cyclical, lag and recency-weight
//! columns from an observation table using Polars lazy expressions.

use crate::features::error::FeatureError;
use crate::types::weather_record::{Parameter, WeatherRecord, TIME_COLUMN, WEATHER_CODE_COLUMN};
use crate::types::weather_table::{records_to_frame, WeatherTable};
use bon::Builder;
use chrono::Datelike;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const HOUR_COLUMN: &str = "hour";
pub const DAY_OF_YEAR_COLUMN: &str = "day_of_year";
pub const MONTH_COLUMN: &str = "month";
pub const DAY_OF_WEEK_COLUMN: &str = "day_of_week";
pub const HOUR_SIN_COLUMN: &str = "hour_sin";
pub const HOUR_COS_COLUMN: &str = "hour_cos";
pub const DOY_SIN_COLUMN: &str = "doy_sin";
pub const DOY_COS_COLUMN: &str = "doy_cos";
pub const SAMPLE_WEIGHT_COLUMN: &str = "sample_weight";

/// Calendar and cyclical columns shared by every model, in schema order.
pub const CALENDAR_FEATURES: [&str; 8] = [
    HOUR_COLUMN,
    DAY_OF_YEAR_COLUMN,
    MONTH_COLUMN,
    DAY_OF_WEEK_COLUMN,
    HOUR_SIN_COLUMN,
    HOUR_COS_COLUMN,
    DOY_SIN_COLUMN,
    DOY_COS_COLUMN,
];

const HOURS_PER_DAY: f64 = 24.0;
// 365.25 absorbs leap-year drift.
const DAYS_PER_YEAR: f64 = 365.25;

/// Name of the `k`-th lag column of `column`, e.g. `temperature_lag2`.
pub fn lag_column_name(column: &str, k: usize) -> String {
    format!("{column}_lag{k}")
}

fn default_lag_columns() -> Vec<String> {
    Parameter::ALL
        .iter()
        .map(|p| p.column_name().to_string())
        .chain(std::iter::once(WEATHER_CODE_COLUMN.to_string()))
        .collect()
}

/// Parameters of the feature transforms.
///
/// # Examples
///
/// ```
/// use weathercast::FeatureConfig;
///
/// let config = FeatureConfig::builder()
///     .max_lag(3)
///     .decay(0.5)
///     .center_year(2025)
///     .build();
/// assert_eq!(config.lag_columns.len(), 8);
/// assert_eq!(FeatureConfig::default().max_lag, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct FeatureConfig {
    /// Highest lag order `L`; columns `{col}_lag1..={col}_lagL` are emitted.
    #[builder(default = 1)]
    pub max_lag: usize,
    /// Exponential decay rate of the recency weight, per year.
    #[builder(default = 0.5)]
    pub decay: f64,
    /// Year that receives weight 1. Defaults to the year of the latest observation.
    pub center_year: Option<i32>,
    /// Columns that receive lag features.
    #[builder(default = default_lag_columns())]
    pub lag_columns: Vec<String>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl FeatureConfig {
    /// Lag column names of `column` (`_lag1` to `_lagL`), or nothing if `column` is not lagged.
    pub fn lags_of(&self, column: &str) -> Vec<String> {
        if !self.lag_columns.iter().any(|c| c == column) {
            return Vec::new();
        }
        (1..=self.max_lag).map(|k| lag_column_name(column, k)).collect()
    }

    fn validate(&self) -> Result<(), FeatureError> {
        if self.max_lag == 0 {
            return Err(FeatureError::InvalidConfig(
                "max_lag must be at least 1".to_string(),
            ));
        }
        if !self.decay.is_finite() || self.decay <= 0.0 {
            return Err(FeatureError::InvalidConfig(format!(
                "decay must be a positive finite number, got {}",
                self.decay
            )));
        }
        Ok(())
    }
}

/// Derives model-ready features from an observation table.
///
/// All transforms are pure functions of the input table and the [`FeatureConfig`]:
///
/// * **Temporal**: `hour`, `day_of_year`, `month`, `day_of_week` (0 = Monday).
/// * **Cyclical**: `sin(2π·x/P)` and `cos(2π·x/P)` of the hour (`P = 24`) and the day of
///   year (`P = 365.25`), as `hour_sin`, `hour_cos`, `doy_sin`, `doy_cos`.
/// * **Lags**: `{col}_lag{k}` is the value of `col` exactly `k` rows earlier. The first `k`
///   rows have a null lag, never zero.
/// * **Recency weight**: `sample_weight = exp(-decay · (center_year - year))`.
///
/// The input must already be sorted ascending by time, which [`WeatherTable`] guarantees.
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    config: FeatureConfig,
}

impl FeatureEngineer {
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidConfig`] if `max_lag` is zero or `decay` is not a
    /// positive finite number.
    pub fn new(config: FeatureConfig) -> Result<Self, FeatureError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Engineers the full feature frame for `table`, one output row per input row.
    pub fn engineer(&self, table: &WeatherTable) -> Result<DataFrame, FeatureError> {
        let center_year = self
            .config
            .center_year
            .or_else(|| table.latest().map(|r| r.time.year()))
            .unwrap_or(1970);
        self.engineer_records(table.records(), center_year)
    }

    /// Engineers features for records that are already sorted and unique.
    pub(crate) fn engineer_records(
        &self,
        records: &[WeatherRecord],
        center_year: i32,
    ) -> Result<DataFrame, FeatureError> {
        let frame = records_to_frame(records)?;
        Ok(self.transform(frame.lazy(), center_year).collect()?)
    }

    /// Appends every feature column to a lazy observation frame.
    pub fn transform(&self, frame: LazyFrame, center_year: i32) -> LazyFrame {
        let mut first_pass = Self::temporal_exprs();
        first_pass.extend(self.lag_exprs());
        first_pass.push(self.weight_expr(center_year));

        frame
            .with_columns(first_pass)
            .with_columns(Self::cyclical_exprs())
    }

    fn temporal_exprs() -> Vec<Expr> {
        let time = || col(TIME_COLUMN).dt();
        vec![
            time().hour().cast(DataType::Int32).alias(HOUR_COLUMN),
            time()
                .ordinal_day()
                .cast(DataType::Int32)
                .alias(DAY_OF_YEAR_COLUMN),
            time().month().cast(DataType::Int32).alias(MONTH_COLUMN),
            // Polars weekdays run 1 (Monday) to 7 (Sunday).
            (time().weekday().cast(DataType::Int32) - lit(1)).alias(DAY_OF_WEEK_COLUMN),
        ]
    }

    fn cyclical_exprs() -> Vec<Expr> {
        let (hour_sin, hour_cos) = cyclical_pair(HOUR_COLUMN, HOURS_PER_DAY);
        let (doy_sin, doy_cos) = cyclical_pair(DAY_OF_YEAR_COLUMN, DAYS_PER_YEAR);
        vec![
            hour_sin.alias(HOUR_SIN_COLUMN),
            hour_cos.alias(HOUR_COS_COLUMN),
            doy_sin.alias(DOY_SIN_COLUMN),
            doy_cos.alias(DOY_COS_COLUMN),
        ]
    }

    fn lag_exprs(&self) -> Vec<Expr> {
        self.config
            .lag_columns
            .iter()
            .flat_map(|column| {
                (1..=self.config.max_lag).map(move |k| {
                    col(column.as_str())
                        .shift(lit(k as i64))
                        .alias(lag_column_name(column, k))
                })
            })
            .collect()
    }

    fn weight_expr(&self, center_year: i32) -> Expr {
        let age = lit(center_year as f64) - col(TIME_COLUMN).dt().year().cast(DataType::Float64);
        (age * lit(-self.config.decay))
            .exp()
            .alias(SAMPLE_WEIGHT_COLUMN)
    }
}

fn cyclical_pair(column: &str, period: f64) -> (Expr, Expr) {
    let angle = col(column).cast(DataType::Float64) * lit(2.0 * PI / period);
    (angle.clone().sin(), angle.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{hour, synthetic_table};
    use crate::utils::float_values;
    use chrono::{TimeZone, Utc};

    fn engineer(max_lag: usize, center_year: Option<i32>) -> FeatureEngineer {
        FeatureEngineer::new(
            FeatureConfig::builder()
                .max_lag(max_lag)
                .decay(0.5)
                .maybe_center_year(center_year)
                .build(),
        )
        .expect("valid config")
    }

    #[test]
    fn test_output_has_equal_length_and_feature_columns() -> Result<(), Box<dyn std::error::Error>> {
        let table = synthetic_table(hour(2024, 1, 1, 0), 48);
        let df = engineer(2, None).engineer(&table)?;
        assert_eq!(df.height(), 48);
        for name in CALENDAR_FEATURES
            .iter()
            .copied()
            .chain([SAMPLE_WEIGHT_COLUMN, "temperature_lag1", "temperature_lag2", "weather_code_lag2"])
        {
            assert!(df.get_column_index(name).is_some(), "missing column {name}");
        }
        Ok(())
    }

    #[test]
    fn test_cyclical_hour_encoding() -> Result<(), Box<dyn std::error::Error>> {
        let table = synthetic_table(hour(2024, 1, 1, 0), 24);
        let df = engineer(1, None).engineer(&table)?;
        let sin = float_values(&df, HOUR_SIN_COLUMN)?;
        let cos = float_values(&df, HOUR_COS_COLUMN)?;
        let hours = float_values(&df, HOUR_COLUMN)?;

        for i in 0..24 {
            let (s, c) = (sin[i].unwrap(), cos[i].unwrap());
            assert!((s * s + c * c - 1.0).abs() < 1e-12, "hour {i}");
            assert!((-1.0..=1.0).contains(&s) && (-1.0..=1.0).contains(&c));
            assert_eq!(hours[i], Some(i as f64));
        }
        assert!(sin[0].unwrap().abs() < 1e-12);
        assert!((cos[0].unwrap() - 1.0).abs() < 1e-12);
        // 23:00 sits next to 00:00 on the circle.
        assert!((cos[23].unwrap() - cos[1].unwrap()).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_calendar_columns() -> Result<(), Box<dyn std::error::Error>> {
        // 2024-12-31 is a Tuesday and the 366th day of a leap year.
        let table = synthetic_table(Utc.with_ymd_and_hms(2024, 12, 31, 22, 0, 0).unwrap(), 3);
        let df = engineer(1, None).engineer(&table)?;
        assert_eq!(float_values(&df, DAY_OF_YEAR_COLUMN)?, vec![Some(366.0), Some(366.0), Some(1.0)]);
        assert_eq!(float_values(&df, MONTH_COLUMN)?, vec![Some(12.0), Some(12.0), Some(1.0)]);
        assert_eq!(float_values(&df, DAY_OF_WEEK_COLUMN)?, vec![Some(1.0), Some(1.0), Some(2.0)]);
        Ok(())
    }

    #[test]
    fn test_lag_columns_reference_earlier_rows() -> Result<(), Box<dyn std::error::Error>> {
        let table = synthetic_table(hour(2024, 2, 1, 0), 30);
        let df = engineer(3, None).engineer(&table)?;
        let temperature = float_values(&df, "temperature")?;

        for k in 1..=3 {
            let lag = float_values(&df, &lag_column_name("temperature", k))?;
            for i in 0..df.height() {
                if i < k {
                    assert_eq!(lag[i], None, "row {i} lag {k} should be undefined");
                } else {
                    assert_eq!(lag[i], temperature[i - k], "row {i} lag {k}");
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_lags_are_row_based_across_gaps() -> Result<(), Box<dyn std::error::Error>> {
        let full = synthetic_table(hour(2024, 2, 1, 0), 10);
        let records: Vec<_> = full
            .records()
            .iter()
            .filter(|r| r.time != hour(2024, 2, 1, 4))
            .cloned()
            .collect();
        let table = WeatherTable::new(records)?;
        let df = engineer(1, None).engineer(&table)?;
        let temperature = float_values(&df, "temperature")?;
        let lag = float_values(&df, "temperature_lag1")?;
        // Row 4 is 05:00, its lag-1 is the 03:00 row: gaps are not filled.
        assert_eq!(lag[4], temperature[3]);
        Ok(())
    }

    #[test]
    fn test_recency_weight_is_monotonic() -> Result<(), Box<dyn std::error::Error>> {
        let records: Vec<_> = (2020..=2025)
            .flat_map(|year| synthetic_table(hour(year, 6, 1, 0), 1).records().to_vec())
            .collect();
        let table = WeatherTable::new(records)?;
        let df = engineer(1, Some(2025)).engineer(&table)?;
        let weights: Vec<f64> = float_values(&df, SAMPLE_WEIGHT_COLUMN)?
            .into_iter()
            .map(|w| w.unwrap())
            .collect();

        assert!((weights[5] - 1.0).abs() < 1e-12);
        assert!(weights.windows(2).all(|pair| pair[0] < pair[1]));
        assert!((weights[4] - (-0.5f64).exp()).abs() < 1e-12);
        assert!(weights.iter().all(|w| *w > 0.0));
        Ok(())
    }

    #[test]
    fn test_center_year_defaults_to_latest() -> Result<(), Box<dyn std::error::Error>> {
        let table = synthetic_table(hour(2023, 12, 31, 23), 2);
        let df = engineer(1, None).engineer(&table)?;
        let weights = float_values(&df, SAMPLE_WEIGHT_COLUMN)?;
        assert!((weights[1].unwrap() - 1.0).abs() < 1e-12);
        assert!((weights[0].unwrap() - (-0.5f64).exp()).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_engineering_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
        let table = synthetic_table(hour(2024, 4, 1, 0), 72);
        let fe = engineer(2, Some(2024));
        assert!(fe.engineer(&table)?.equals_missing(&fe.engineer(&table)?));
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        let zero_lag = FeatureConfig::builder().max_lag(0).build();
        assert!(matches!(FeatureEngineer::new(zero_lag), Err(FeatureError::InvalidConfig(_))));
        let bad_decay = FeatureConfig::builder().decay(0.0).build();
        assert!(matches!(FeatureEngineer::new(bad_decay), Err(FeatureError::InvalidConfig(_))));
        assert!(FeatureEngineer::new(FeatureConfig::builder().decay(f64::NAN).build()).is_err());
    }

    #[test]
    fn test_lags_of_unlagged_column_is_empty() {
        let config = FeatureConfig::builder()
            .max_lag(2)
            .lag_columns(vec!["temperature".to_string()])
            .build();
        assert_eq!(config.lags_of("temperature"), ["temperature_lag1", "temperature_lag2"]);
        assert!(config.lags_of("humidity").is_empty());
    }
}
