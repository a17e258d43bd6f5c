use std::sync::{Arc, RwLock};

use thiserror::Error;

/// Failure reading from the data pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataPoolError {
    #[error("data pool unavailable: {0}")]
    Unavailable(String),
}

/// Read side of the data pool, as far as the pipeline needs it.
///
/// `current_data_version` returns the raw token of the latest committed import
/// snapshot. Validation into a `DataVersion` is the caller's job, so a malformed
/// token surfaces as an invalid-version error rather than a pool error.
pub trait DataPoolReader: Send + Sync {
    fn current_data_version(&self) -> Result<String, DataPoolError>;
}

impl<R> DataPoolReader for Arc<R>
where
    R: DataPoolReader + ?Sized,
{
    fn current_data_version(&self) -> Result<String, DataPoolError> {
        (**self).current_data_version()
    }
}

/// Settable data pool for tests/dev.
#[derive(Debug)]
pub struct InMemoryDataPool {
    version: RwLock<String>,
}

impl InMemoryDataPool {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: RwLock::new(version.into()),
        }
    }

    /// Simulate a new import being committed.
    pub fn set_current_data_version(&self, version: impl Into<String>) -> Result<(), DataPoolError> {
        let mut guard = self
            .version
            .write()
            .map_err(|_| DataPoolError::Unavailable("lock poisoned".to_string()))?;
        *guard = version.into();
        Ok(())
    }
}

impl DataPoolReader for InMemoryDataPool {
    fn current_data_version(&self) -> Result<String, DataPoolError> {
        self.version
            .read()
            .map(|v| v.clone())
            .map_err(|_| DataPoolError::Unavailable("lock poisoned".to_string()))
    }
}
