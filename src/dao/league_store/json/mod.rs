mod config;
mod document;
mod error;
mod store;

pub use config::JsonStoreConfig;
pub use error::JsonDaoError;
pub use store::JsonLeagueStore;

use crate::dao::storage::StorageError;

impl From<JsonDaoError> for StorageError {
    fn from(err: JsonDaoError) -> Self {
        match err {
            JsonDaoError::Parse { .. } => StorageError::Malformed {
                message: err.to_string(),
            },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
