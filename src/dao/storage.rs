use std::{error::Error, path::PathBuf};

use thiserror::Error;

use crate::dao::table::TableName;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying file format.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend failed to open, read or write the store.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What the backend was doing.
        message: String,
        /// Backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Another process holds the store open.
    #[error("store `{}` is locked by another process", path.display())]
    Locked {
        /// Store file that is locked.
        path: PathBuf,
    },
    /// A table is absent from the store.
    #[error("table `{table}` is missing from the store")]
    MissingTable {
        /// Table that was requested.
        table: TableName,
    },
    /// The store could be read but its contents make no sense.
    #[error("store contents are malformed: {message}")]
    Malformed {
        /// Description of the problem.
        message: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Whether retrying later (once the conflicting holder releases the store) may succeed.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StorageError::Unavailable { .. } | StorageError::Locked { .. }
        )
    }
}
