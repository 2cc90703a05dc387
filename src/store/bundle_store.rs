use crate::features::schema::FEATURE_SCHEMA_VERSION;
use crate::models::bundle::ModelBundle;
use crate::store::error::BundleStoreError;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bincode::config::{Configuration, Fixint, LittleEndian};
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

pub const BUNDLE_FILE_NAME: &str = "model_bundle.bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// Directory bundles are stored in when the caller has no preference.
pub fn default_bundle_dir() -> Result<PathBuf, BundleStoreError> {
    get_cache_dir().map_err(BundleStoreError::CacheDirResolution)
}

/// Writes `bundle` to `dir/model_bundle.bin`, creating `dir` if needed.
///
/// The file is written to a temporary sibling first and renamed into place, so a reader
/// never observes a partially written bundle.
///
/// # Returns
///
/// The path of the written file.
pub async fn save_bundle(bundle: Arc<ModelBundle>, dir: &Path) -> Result<PathBuf, BundleStoreError> {
    ensure_cache_dir_exists(dir)
        .await
        .map_err(|e| BundleStoreError::CacheDirCreation(dir.to_path_buf(), e))?;

    let dir = dir.to_path_buf();
    let path = dir.join(BUNDLE_FILE_NAME);
    let target = path.clone();
    let start = std::time::Instant::now();
    let written = tokio::task::spawn_blocking(move || {
        let bytes = bincode::serde::encode_to_vec(bundle.as_ref(), BINCODE_CONFIG)
            .map_err(|e| BundleStoreError::Encode(Box::new(e)))?;
        let write_error = |e| BundleStoreError::Write(target.clone(), e);
        let mut file = NamedTempFile::new_in(&dir).map_err(write_error)?;
        file.write_all(&bytes).map_err(write_error)?;
        file.persist(&target)
            .map_err(|e| BundleStoreError::Write(target.clone(), e.error))?;
        Ok::<usize, BundleStoreError>(bytes.len())
    })
    .await??;

    info!(
        "Wrote model bundle ({} bytes) to {} in {:?}",
        written,
        path.display(),
        start.elapsed()
    );
    Ok(path)
}

/// Reads the bundle stored in `dir`.
///
/// # Errors
///
/// [`BundleStoreError::IncompatibleVersion`] if the bundle was built with a different
/// feature layout than this build of the crate.
pub async fn load_bundle(dir: &Path) -> Result<ModelBundle, BundleStoreError> {
    let path = dir.join(BUNDLE_FILE_NAME);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| BundleStoreError::Read(path.clone(), e))?;

    let decode_path = path.clone();
    let bundle = tokio::task::spawn_blocking(move || {
        bincode::serde::decode_from_slice::<ModelBundle, _>(&bytes, BINCODE_CONFIG)
            .map(|(bundle, _)| bundle)
            .map_err(|e| BundleStoreError::Decode(decode_path, Box::new(e)))
    })
    .await??;

    if bundle.schema_version() != FEATURE_SCHEMA_VERSION {
        return Err(BundleStoreError::IncompatibleVersion {
            path,
            found: bundle.schema_version(),
            expected: FEATURE_SCHEMA_VERSION,
        });
    }
    info!(
        "Loaded model bundle trained through {} from {}",
        bundle.trained_through(),
        path.display()
    );
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fast_training_config, hour, synthetic_table};
    use crate::training::trainer::train;

    #[tokio::test]
    async fn test_save_then_load() -> Result<(), Box<dyn std::error::Error>> {
        let history = synthetic_table(hour(2024, 5, 1, 0), 24 * 5);
        let bundle = Arc::new(train(&history, &fast_training_config())?.bundle);

        let root = tempfile::tempdir()?;
        let dir = root.path().join("bundles");
        let path = save_bundle(bundle.clone(), &dir).await?;
        assert_eq!(path, dir.join(BUNDLE_FILE_NAME));

        let loaded = load_bundle(&dir).await?;
        assert_eq!(&loaded, bundle.as_ref());
        Ok(())
    }

    #[tokio::test]
    async fn test_load_errors() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempfile::tempdir()?;
        assert!(matches!(
            load_bundle(root.path()).await,
            Err(BundleStoreError::Read(_, _))
        ));

        tokio::fs::write(root.path().join(BUNDLE_FILE_NAME), b"not a bundle").await?;
        assert!(matches!(
            load_bundle(root.path()).await,
            Err(BundleStoreError::Decode(_, _))
        ));
        Ok(())
    }
}
