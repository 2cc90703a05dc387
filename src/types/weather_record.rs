//! Defines the hourly observation record and the continuous weather parameters it carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the timestamp column in every frame produced by this crate.
pub const TIME_COLUMN: &str = "time";
/// Name of the WMO weather code column.
pub const WEATHER_CODE_COLUMN: &str = "weather_code";
/// Name of the optional day/night flag column.
pub const IS_DAY_COLUMN: &str = "is_day";

/// A continuous weather parameter that is forecast by a regression model.
///
/// Units follow the collaborator data store: temperature in °C, humidity and cloud
/// cover in %, wind direction in degrees, wind speed in km/h, surface pressure in hPa
/// and precipitation in mm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Parameter {
    /// Air temperature at 2 m (°C).
    Temperature,
    /// Relative humidity at 2 m (%).
    Humidity,
    /// Wind direction at 10 m (°).
    WindDirection,
    /// Wind speed at 10 m (km/h).
    WindSpeed,
    /// Total cloud cover (%).
    CloudCover,
    /// Surface pressure (hPa).
    SurfacePressure,
    /// Precipitation over the preceding hour (mm).
    Precipitation,
}

impl Parameter {
    /// Every continuous parameter, in column order.
    pub const ALL: [Parameter; 7] = [
        Parameter::Temperature,
        Parameter::Humidity,
        Parameter::WindDirection,
        Parameter::WindSpeed,
        Parameter::CloudCover,
        Parameter::SurfacePressure,
        Parameter::Precipitation,
    ];

    /// The parameters handled by the generic regression ensemble.
    ///
    /// Precipitation is excluded: it has its own specialist model.
    pub const ENSEMBLE: [Parameter; 6] = [
        Parameter::Temperature,
        Parameter::Humidity,
        Parameter::WindDirection,
        Parameter::WindSpeed,
        Parameter::CloudCover,
        Parameter::SurfacePressure,
    ];

    /// The column name used for this parameter in frames.
    pub fn column_name(&self) -> &'static str {
        match self {
            Parameter::Temperature => "temperature",
            Parameter::Humidity => "humidity",
            Parameter::WindDirection => "wind_direction",
            Parameter::WindSpeed => "wind_speed",
            Parameter::CloudCover => "cloud_cover",
            Parameter::SurfacePressure => "surface_pressure",
            Parameter::Precipitation => "precipitation",
        }
    }

    /// Column holding the regression ensemble's prediction for this parameter,
    /// used as a stacked input by the weather code classifier.
    pub fn prediction_column(&self) -> String {
        format!("{}_pred", self.column_name())
    }

    /// Restricts a raw model output to the physically meaningful range of the parameter.
    pub(crate) fn clamp_to_range(&self, value: f64) -> f64 {
        match self {
            Parameter::Humidity | Parameter::CloudCover => value.clamp(0.0, 100.0),
            Parameter::WindSpeed | Parameter::Precipitation => value.max(0.0),
            Parameter::WindDirection => value.rem_euclid(360.0),
            Parameter::Temperature | Parameter::SurfacePressure => value,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_name())
    }
}

/// One observation at one hourly timestamp.
///
/// `time` is expected to be aligned to the start of an hour; this is enforced when
/// records are gathered into a [`crate::WeatherTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub time: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_direction: f64,
    pub wind_speed: f64,
    pub cloud_cover: f64,
    pub surface_pressure: f64,
    pub precipitation: f64,
    /// Integer WMO code, see [`crate::WeatherCode`].
    pub weather_code: i32,
    pub is_day: Option<bool>,
}

impl WeatherRecord {
    /// Returns the value of a continuous parameter.
    pub fn value(&self, parameter: Parameter) -> f64 {
        match parameter {
            Parameter::Temperature => self.temperature,
            Parameter::Humidity => self.humidity,
            Parameter::WindDirection => self.wind_direction,
            Parameter::WindSpeed => self.wind_speed,
            Parameter::CloudCover => self.cloud_cover,
            Parameter::SurfacePressure => self.surface_pressure,
            Parameter::Precipitation => self.precipitation,
        }
    }

    /// Sets the value of a continuous parameter.
    pub fn set_value(&mut self, parameter: Parameter, value: f64) {
        let slot = match parameter {
            Parameter::Temperature => &mut self.temperature,
            Parameter::Humidity => &mut self.humidity,
            Parameter::WindDirection => &mut self.wind_direction,
            Parameter::WindSpeed => &mut self.wind_speed,
            Parameter::CloudCover => &mut self.cloud_cover,
            Parameter::SurfacePressure => &mut self.surface_pressure,
            Parameter::Precipitation => &mut self.precipitation,
        };
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_physical_ranges() {
        assert_eq!(Parameter::Humidity.clamp_to_range(104.0), 100.0);
        assert_eq!(Parameter::CloudCover.clamp_to_range(-3.0), 0.0);
        assert_eq!(Parameter::Precipitation.clamp_to_range(-0.2), 0.0);
        assert_eq!(Parameter::WindDirection.clamp_to_range(370.0), 10.0);
        assert_eq!(Parameter::WindDirection.clamp_to_range(-90.0), 270.0);
        assert_eq!(Parameter::Temperature.clamp_to_range(-12.5), -12.5);
    }

    #[test]
    fn test_value_accessors_cover_every_parameter() {
        let mut record = crate::test_support::record_at(
            chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 5, 1, 12, 0, 0).unwrap(),
        );
        for (i, parameter) in Parameter::ALL.iter().enumerate() {
            record.set_value(*parameter, i as f64 + 0.5);
        }
        for (i, parameter) in Parameter::ALL.iter().enumerate() {
            assert_eq!(record.value(*parameter), i as f64 + 0.5, "{parameter}");
        }
        assert_eq!(Parameter::WindSpeed.prediction_column(), "wind_speed_pred");
    }
}
