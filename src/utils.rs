use chrono::{DateTime, Timelike, Utc};
use log::info;
use polars::prelude::*;
use std::io;
use std::path::{Path, PathBuf};

const CACHE_DIR_NAME: &str = "weathercast_cache";

/// Default directory for persisted model bundles (`~/.cache/weathercast_cache` on Linux).
pub fn get_cache_dir() -> Result<PathBuf, io::Error> {
    dirs::cache_dir()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine system cache directory",
            )
        })
        .map(|p| p.join(CACHE_DIR_NAME))
}

pub async fn ensure_cache_dir_exists(path: &Path) -> Result<(), io::Error> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("Cache path exists but is not a directory: {}", path.display()),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating cache directory: {}", path.display());
            tokio::fs::create_dir_all(path).await
        }
        Err(e) => Err(e),
    }
}

pub(crate) fn is_hour_aligned(time: &DateTime<Utc>) -> bool {
    time.minute() == 0 && time.second() == 0 && time.nanosecond() == 0
}

/// Reads a numeric (or boolean) column as nullable `f64` values.
pub(crate) fn float_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_is_hour_aligned() {
        assert!(is_hour_aligned(&Utc.with_ymd_and_hms(2025, 1, 1, 3, 0, 0).unwrap()));
        assert!(!is_hour_aligned(&Utc.with_ymd_and_hms(2025, 1, 1, 3, 0, 1).unwrap()));
        assert!(!is_hour_aligned(&Utc.with_ymd_and_hms(2025, 1, 1, 3, 15, 0).unwrap()));
    }

    #[test]
    fn test_float_values_casts_and_keeps_nulls() -> PolarsResult<()> {
        let df = DataFrame::new(vec![Column::new("v".into(), [Some(1i32), None, Some(3)])])?;
        assert_eq!(float_values(&df, "v")?, vec![Some(1.0), None, Some(3.0)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_cache_dir_creates_nested() -> Result<(), io::Error> {
        let root = tempfile::tempdir()?;
        let nested = root.path().join("a").join("b");
        ensure_cache_dir_exists(&nested).await?;
        assert!(nested.is_dir());
        // Second call is a no-op.
        ensure_cache_dir_exists(&nested).await?;
        Ok(())
    }
}
