use crate::features::engineer::{FeatureEngineer, SAMPLE_WEIGHT_COLUMN};
use crate::features::schema::FeatureRow;
use crate::forecast::error::ForecastError;
use crate::models::bundle::ModelBundle;
use crate::models::regression_ensemble::RegressionEnsemble;
use crate::types::forecast_row::{ForecastRow, ForecastTable};
use crate::types::into_utc_trait::IntoUtcDateTime;
use crate::types::weather_record::{Parameter, WeatherRecord, IS_DAY_COLUMN, WEATHER_CODE_COLUMN};
use crate::utils::is_hour_aligned;
use chrono::{DateTime, Datelike, Duration, Utc};
use log::debug;
use std::sync::Arc;

/// Furthest a target may lie after the latest observation.
pub const MAX_HORIZON_HOURS: i64 = 48;

/// Result of a forecast request.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    /// The row at the requested hour, observed or predicted.
    pub row: ForecastRow,
    /// The input table extended with every hour predicted on the way to the target.
    pub table: ForecastTable,
}

/// Horizon-bounded, autoregressive forecaster over a shared [`ModelBundle`].
///
/// Predicting hour `h` needs lag features from the hours before it. When those hours lie
/// in the future they are predicted first, walking forward one hour at a time from the
/// latest observation, and each prediction becomes a lag input for the next. Hours that
/// already have a row in the working table (observed, or predicted by an earlier call)
/// are reused as they are.
///
/// The forecaster never mutates its input: every request works on its own copy of the
/// table, which is returned in [`Forecast::table`]. A failed request therefore leaves the
/// caller's table unchanged.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use weathercast::{train, ForecastTable, Forecaster, TrainingConfig, WeatherTable};
///
/// # fn run(history: WeatherTable) -> Result<(), weathercast::WeathercastError> {
/// let outcome = train(&history, &TrainingConfig::default())?;
/// let forecaster = Forecaster::new(Arc::new(outcome.bundle))?;
///
/// let table = ForecastTable::from(&history);
/// let forecast = forecaster.forecast_next(&table, 6)?;
/// println!("{:?}", forecast.row);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Forecaster {
    bundle: Arc<ModelBundle>,
    engineer: FeatureEngineer,
}

impl Forecaster {
    /// # Errors
    ///
    /// Returns [`ForecastError::Feature`] if the bundle carries an invalid feature
    /// configuration.
    pub fn new(bundle: Arc<ModelBundle>) -> Result<Self, ForecastError> {
        let engineer = FeatureEngineer::new(bundle.features().clone())?;
        Ok(Self { bundle, engineer })
    }

    pub fn bundle(&self) -> &Arc<ModelBundle> {
        &self.bundle
    }

    /// Returns the row at `target`, predicting every missing hour between the latest
    /// observation and `target`.
    ///
    /// # Arguments
    ///
    /// * `table` - Observed history, possibly followed by rows predicted earlier.
    /// * `target` - Hour-aligned instant at most [`MAX_HORIZON_HOURS`] after the latest
    ///   observation.
    ///
    /// # Errors
    ///
    /// * [`ForecastError::UnalignedTimestamp`] if `target` is not on the hour.
    /// * [`ForecastError::EmptyHistory`] if `table` has no observed rows.
    /// * [`ForecastError::HorizonExceeded`] if `target` is too far ahead.
    /// * [`ForecastError::ObservationNotFound`] if `target` falls into a gap of the history.
    /// * [`ForecastError::LagUnavailable`] if the history is shorter than the lag depth.
    pub fn forecast(
        &self,
        table: &ForecastTable,
        target: impl IntoUtcDateTime,
    ) -> Result<Forecast, ForecastError> {
        let target = target.into_utc();
        if !is_hour_aligned(&target) {
            return Err(ForecastError::UnalignedTimestamp(target));
        }
        let latest = table.latest_observed().ok_or(ForecastError::EmptyHistory)?;
        if target > latest + Duration::hours(MAX_HORIZON_HOURS) {
            return Err(ForecastError::HorizonExceeded {
                target,
                latest,
                horizon_hours: MAX_HORIZON_HOURS,
            });
        }

        if target <= latest {
            let row = table
                .get(target)
                .cloned()
                .ok_or(ForecastError::ObservationNotFound(target))?;
            return Ok(Forecast {
                row,
                table: table.clone(),
            });
        }

        let mut working = table.clone();
        let mut hour = latest + Duration::hours(1);
        while hour <= target {
            if working.get(hour).is_none() {
                let row = self.predict_hour(&working, hour)?;
                debug!("Predicted weather for {hour}");
                working.insert(row);
            }
            hour += Duration::hours(1);
        }

        let row = working
            .get(target)
            .cloned()
            .ok_or(ForecastError::ObservationNotFound(target))?;
        Ok(Forecast {
            row,
            table: working,
        })
    }

    /// Forecasts the hour `hours` after the latest observation.
    pub fn forecast_next(&self, table: &ForecastTable, hours: u32) -> Result<Forecast, ForecastError> {
        let latest = table.latest_observed().ok_or(ForecastError::EmptyHistory)?;
        self.forecast(table, latest + Duration::hours(i64::from(hours)))
    }

    /// Predicts a single hour from the rows immediately preceding it.
    fn predict_hour(&self, table: &ForecastTable, hour: DateTime<Utc>) -> Result<ForecastRow, ForecastError> {
        let mut features = self.featurize(table, hour)?;

        let bundle = &self.bundle;
        let predictions = bundle.ensemble().predict_all(&features)?;
        let precipitation = bundle.precipitation().predict(&features)?;
        RegressionEnsemble::stack_row(&mut features, &predictions);
        let weather_code = bundle.classifier().predict(&features)?;

        let mut record = WeatherRecord {
            time: hour,
            temperature: 0.0,
            humidity: 0.0,
            wind_direction: 0.0,
            wind_speed: 0.0,
            cloud_cover: 0.0,
            surface_pressure: 0.0,
            precipitation,
            weather_code,
            is_day: None,
        };
        for (parameter, value) in predictions {
            record.set_value(parameter, value);
        }
        Ok(ForecastRow::predicted(record))
    }

    /// Engineers the feature row of `hour` from the `max_lag` rows before it.
    ///
    /// The observation columns of the row itself are unknown and are removed, so a model
    /// can only ever read calendar features and lags.
    fn featurize(&self, table: &ForecastTable, hour: DateTime<Utc>) -> Result<FeatureRow, ForecastError> {
        let max_lag = self.engineer.config().max_lag;
        let context = table.rows_before(hour, max_lag);
        if context.len() < max_lag {
            return Err(ForecastError::LagUnavailable {
                target: hour,
                required: max_lag,
                available: context.len(),
            });
        }

        let mut records: Vec<WeatherRecord> = context.iter().map(|row| row.record.clone()).collect();
        let mut stub = records
            .last()
            .cloned()
            .ok_or(ForecastError::EmptyHistory)?;
        stub.time = hour;
        records.push(stub);

        let center_year = self.engineer.config().center_year.unwrap_or_else(|| hour.year());
        let frame = self.engineer.engineer_records(&records, center_year)?;
        let mut row = FeatureRow::from_frame(&frame, frame.height().saturating_sub(1))?;

        for parameter in Parameter::ALL {
            row.remove(parameter.column_name());
        }
        for column in [WEATHER_CODE_COLUMN, IS_DAY_COLUMN, SAMPLE_WEIGHT_COLUMN] {
            row.remove(column);
        }
        Ok(row)
    }
}
