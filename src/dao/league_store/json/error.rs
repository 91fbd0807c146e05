//! Error types raised by the JSON storage implementation.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias returning [`JsonDaoError`] failures.
pub type JsonResult<T> = Result<T, JsonDaoError>;

/// Failures that can occur while reading or writing the JSON league file.
#[derive(Debug, Error)]
pub enum JsonDaoError {
    /// The league file could not be read.
    #[error("failed to read league file `{}`", path.display())]
    Read {
        /// League file involved.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// The league file is not a valid league document.
    #[error("failed to parse league file `{}`", path.display())]
    Parse {
        /// League file involved.
        path: PathBuf,
        /// Underlying serde_json failure.
        #[source]
        source: serde_json::Error,
    },
    /// Serializing the league document failed.
    #[error("failed to encode league document")]
    Encode {
        /// Underlying serde_json failure.
        #[source]
        source: serde_json::Error,
    },
    /// The encoded document could not be written.
    #[error("failed to write league file `{}`", path.display())]
    Write {
        /// League file involved.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
}
