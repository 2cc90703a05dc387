use std::env;
use std::sync::Arc;
use weathercast::{
    default_bundle_dir, load_history_csv, save_bundle, train, ForecastTable, Forecaster,
    Holdout, TrainingConfig, WeatherCode, WeathercastError,
};

#[tokio::main]
async fn main() -> Result<(), WeathercastError> {
    configure_polars_display();
    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "dataset/delhi_weather.csv".to_string());

    let history = load_history_csv(&path).await?;
    println!("Loaded {} observations from {}", history.len(), path);

    let config = TrainingConfig::builder()
        .holdout(Holdout::YearsBeforeLatest(1))
        .build();
    let outcome = tokio::task::spawn_blocking(move || {
        let outcome = train(&history, &config)?;
        Ok::<_, WeathercastError>((outcome, history))
    })
    .await
    .expect("training task panicked")?;
    let (outcome, history) = outcome;
    println!("{:#?}", outcome.report);

    let bundle = Arc::new(outcome.bundle);
    let stored = save_bundle(bundle.clone(), &default_bundle_dir()?).await?;
    println!("Saved model bundle to {}", stored.display());

    let forecaster = Forecaster::new(bundle)?;
    let forecast = forecaster.forecast_next(&ForecastTable::from(history), 24)?;
    for row in forecast.table.predicted() {
        let code = WeatherCode::from_i64(i64::from(row.record.weather_code));
        println!(
            "{}  {:>5.1}°C  {:>5.1}%  {:>4.1} mm  {}",
            row.time(),
            row.record.temperature,
            row.record.humidity,
            row.record.precipitation,
            code.map_or("unknown", |c| c.description())
        );
    }
    println!("{}", forecast.table.to_frame()?.tail(Some(24)));

    Ok(())
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    env::set_var("POLARS_FMT_MAX_ROWS", "30");
}
