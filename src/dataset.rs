//! Dataset loading.
//!
//! Reads the configured CSV export into a [`DatasetIndex`] exactly once at
//! startup. A missing or unreadable file, or one without a usable header,
//! is fatal: the server never starts on an empty dataset that would look
//! like "no results".

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use odcaf_core::DatasetIndex;

use crate::config::Config;

/// Read and index the file at `path`.
pub fn load_dataset_from(path: &Path) -> Result<DatasetIndex> {
    tracing::info!(path = %path.display(), "loading ODCAF dataset");

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ODCAF data file: {}", path.display()))?;

    let index = DatasetIndex::from_csv_str(&text)
        .with_context(|| format!("Failed to parse ODCAF data file: {}", path.display()))?;

    if index.skipped_rows() > 0 {
        tracing::warn!(
            skipped = index.skipped_rows(),
            "skipped malformed or duplicate rows"
        );
    }
    tracing::info!(facilities = index.len(), "loaded ODCAF dataset");

    Ok(index)
}

/// Load the dataset named by `config.data.path`, ready to share.
pub fn load_dataset(config: &Config) -> Result<Arc<DatasetIndex>> {
    load_dataset_from(&config.data.path).map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_dataset_from(&tmp.path().join("nope.csv")).unwrap_err();
        assert!(err.to_string().contains("Failed to read ODCAF data file"));
    }

    #[test]
    fn test_empty_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();
        let err = load_dataset_from(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("no header"));
    }

    #[test]
    fn test_loads_rows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("odcaf.csv");
        std::fs::write(&path, "Index,Facility_Name\n1,A\n2,B\nx,C\n").unwrap();
        let index = load_dataset_from(&path).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.skipped_rows(), 1);
    }
}
