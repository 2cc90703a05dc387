pub mod bundle_store;
pub mod error;
