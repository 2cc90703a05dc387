use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleStoreError {
    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read model bundle '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to write model bundle '{0}'")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode model bundle from '{0}'")]
    Decode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to encode model bundle")]
    Encode(#[source] Box<bincode::error::EncodeError>),

    #[error("Model bundle '{path}' uses feature schema version {found}, expected {expected}")]
    IncompatibleVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
