//! Data pool readers backed by local storage.

use std::path::{Path, PathBuf};

use catalog_events::{DataPoolError, DataPoolReader};

/// Reads the current data version from a file written by the import job.
///
/// The file holds a single token; surrounding whitespace (the trailing newline
/// most writers add) is stripped. The file is re-read on every call so a
/// long-lived process always stamps events with the latest committed version.
#[derive(Debug, Clone)]
pub struct FileDataPoolReader {
    path: PathBuf,
}

impl FileDataPoolReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataPoolReader for FileDataPoolReader {
    fn current_data_version(&self) -> Result<String, DataPoolError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            DataPoolError::Unavailable(format!("cannot read {}: {e}", self.path.display()))
        })?;
        Ok(raw.trim().to_string())
    }
}
