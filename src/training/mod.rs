pub mod error;
pub mod trainer;
pub mod training_set;
