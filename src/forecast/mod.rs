pub mod error;
pub mod forecaster;
