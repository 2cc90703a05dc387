use crate::models::forest::{ForestConfig, MaxFeatures};
use crate::training::trainer::TrainingConfig;
use crate::training::training_set::Holdout;
use crate::types::weather_record::WeatherRecord;
use crate::types::weather_table::WeatherTable;
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use std::f64::consts::PI;

pub fn hour(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

/// A plausible observation at `time`; the values are fixed.
pub fn record_at(time: DateTime<Utc>) -> WeatherRecord {
    WeatherRecord {
        time,
        temperature: 24.0,
        humidity: 55.0,
        wind_direction: 180.0,
        wind_speed: 9.0,
        cloud_cover: 30.0,
        surface_pressure: 1004.0,
        precipitation: 0.0,
        weather_code: 1,
        is_day: Some(true),
    }
}

/// `hours` consecutive hourly observations starting at `start`.
///
/// The series is deterministic: a daily and a yearly temperature cycle, a drifting cloud
/// field that drives humidity, rain and the weather code, and slowly oscillating pressure
/// and wind. Temperatures are pairwise distinct.
pub fn synthetic_table(start: DateTime<Utc>, hours: usize) -> WeatherTable {
    let records = (0..hours)
        .map(|i| synthetic_record(start + Duration::hours(i as i64), i))
        .collect();
    WeatherTable::new(records).unwrap()
}

fn synthetic_record(time: DateTime<Utc>, i: usize) -> WeatherRecord {
    let x = i as f64;
    let h = time.hour() as f64;
    let doy = time.ordinal() as f64;
    let noise = (i as u64).wrapping_mul(2_654_435_761) % 1000;
    let noise = noise as f64 / 1000.0 - 0.5;

    let cloud_cover = (50.0 + 48.0 * (2.0 * PI * x / 37.0).sin() + 4.0 * noise).clamp(0.0, 100.0);
    let precipitation = if cloud_cover > 85.0 { (cloud_cover - 85.0) / 5.0 } else { 0.0 };
    let weather_code = match cloud_cover {
        c if c > 92.0 => 63,
        c if c > 85.0 => 61,
        c if c > 70.0 => 3,
        c if c > 45.0 => 2,
        c if c > 20.0 => 1,
        _ => 0,
    };

    WeatherRecord {
        time,
        temperature: 22.0
            + 7.0 * (2.0 * PI * (h - 9.0) / 24.0).sin()
            + 8.0 * (2.0 * PI * (doy - 100.0) / 365.25).sin()
            + 0.3 * noise
            + x * 1e-7,
        humidity: (35.0 + 0.5 * cloud_cover + 3.0 * noise).clamp(0.0, 100.0),
        wind_direction: ((i * 17) % 360) as f64,
        wind_speed: 8.0 + 5.0 * (2.0 * PI * x / 13.0).sin().abs(),
        cloud_cover,
        surface_pressure: 1005.0 + 6.0 * (2.0 * PI * x / 91.0).cos(),
        precipitation,
        weather_code,
        is_day: Some((6..18).contains(&time.hour())),
    }
}

/// Tiny forests so tests that train stay fast.
pub fn fast_training_config() -> TrainingConfig {
    let forest = |seed: u64, max_features: MaxFeatures| {
        ForestConfig::builder()
            .n_trees(3)
            .max_depth(6)
            .max_samples(1500)
            .max_features(max_features)
            .seed(seed)
            .build()
    };
    TrainingConfig::builder()
        .holdout(Holdout::Disabled)
        .forest(forest(42, MaxFeatures::All))
        .precipitation_forest(forest(7, MaxFeatures::All))
        .classifier_forest(forest(11, MaxFeatures::Sqrt))
        .build()
}
