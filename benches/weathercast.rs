use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::f64::consts::PI;
use std::sync::Arc;
use weathercast::{
    train, FeatureConfig, FeatureEngineer, ForecastTable, Forecaster, ForestConfig, Holdout,
    TrainingConfig, WeatherRecord, WeatherTable,
};

fn history(hours: usize) -> WeatherTable {
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let records = (0..hours)
        .map(|i| {
            let x = i as f64;
            let cloud_cover = 50.0 + 45.0 * (2.0 * PI * x / 37.0).sin();
            WeatherRecord {
                time: start + Duration::hours(i as i64),
                temperature: 22.0 + 7.0 * (2.0 * PI * x / 24.0).sin(),
                humidity: 35.0 + 0.5 * cloud_cover,
                wind_direction: ((i * 17) % 360) as f64,
                wind_speed: 8.0 + 5.0 * (2.0 * PI * x / 13.0).sin().abs(),
                cloud_cover,
                surface_pressure: 1005.0 + 6.0 * (2.0 * PI * x / 91.0).cos(),
                precipitation: ((cloud_cover - 85.0) / 5.0).max(0.0),
                weather_code: if cloud_cover > 85.0 { 61 } else if cloud_cover > 50.0 { 2 } else { 0 },
                is_day: None,
            }
        })
        .collect();
    WeatherTable::new(records).unwrap()
}

fn bench_weathercast(c: &mut Criterion) {
    let table = history(24 * 365);

    let engineer = FeatureEngineer::new(FeatureConfig::builder().max_lag(3).build()).unwrap();
    c.bench_function("engineer_one_year", |b| {
        b.iter(|| engineer.engineer(black_box(&table)).unwrap())
    });

    let forest = ForestConfig::builder().n_trees(8).max_depth(8).build();
    let config = TrainingConfig::builder()
        .holdout(Holdout::Disabled)
        .forest(forest.clone())
        .precipitation_forest(forest.clone())
        .classifier_forest(forest)
        .build();
    let bundle = Arc::new(train(&table, &config).unwrap().bundle);
    let forecaster = Forecaster::new(bundle).unwrap();
    let working = ForecastTable::from(&table);
    c.bench_function("forecast_24h", |b| {
        b.iter(|| forecaster.forecast_next(black_box(&working), 24).unwrap())
    });
}

criterion_group!(benches, bench_weathercast);
criterion_main!(benches);
