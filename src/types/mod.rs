pub mod error;
pub mod forecast_row;
pub mod into_utc_trait;
pub mod weather_code;
pub mod weather_record;
pub mod weather_table;
