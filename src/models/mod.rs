pub mod bundle;
pub mod error;
pub mod forest;
pub mod precipitation;
pub mod regression_ensemble;
pub mod trained_model;
pub mod tree;
pub mod weather_code_classifier;
