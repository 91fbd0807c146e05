mod cells;
mod error;
mod store;

pub use error::XlsxDaoError;
pub use store::{XlsxLeagueStore, XlsxStoreConfig};

use crate::dao::storage::StorageError;

impl From<XlsxDaoError> for StorageError {
    fn from(err: XlsxDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
