//! Error types raised by the workbook storage implementation.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias returning [`XlsxDaoError`] failures.
pub type XlsxResult<T> = Result<T, XlsxDaoError>;

/// Failures that can occur while reading or writing the league workbook.
#[derive(Debug, Error)]
pub enum XlsxDaoError {
    /// The workbook could not be opened.
    #[error("failed to open workbook `{}`", path.display())]
    Open {
        /// Workbook path.
        path: PathBuf,
        /// Underlying calamine failure.
        #[source]
        source: calamine::XlsxError,
    },
    /// A sheet could not be read.
    #[error("failed to read sheet `{sheet}`")]
    Sheet {
        /// Sheet name.
        sheet: String,
        /// Underlying calamine failure.
        #[source]
        source: calamine::XlsxError,
    },
    /// The workbook could not be written.
    #[error("failed to write workbook")]
    Write {
        /// Underlying writer failure.
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
}

impl From<rust_xlsxwriter::XlsxError> for XlsxDaoError {
    fn from(source: rust_xlsxwriter::XlsxError) -> Self {
        XlsxDaoError::Write { source }
    }
}
