use std::fmt;

use thiserror::Error;

use crate::dao::{storage::StorageError, table::TableName};

/// Failures producing a normalized view from the store.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The backing store cannot be opened for reading.
    #[error("league store unavailable")]
    StoreUnavailable(#[source] StorageError),
    /// A required table or column is missing or malformed.
    #[error("schema mismatch in table `{table}`: {detail}")]
    SchemaMismatch {
        /// Table being read.
        table: TableName,
        /// What did not match.
        detail: String,
    },
}

impl From<StorageError> for LoadError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::MissingTable { table } => LoadError::SchemaMismatch {
                table,
                detail: "table is missing".into(),
            },
            other => LoadError::StoreUnavailable(other),
        }
    }
}

impl LoadError {
    /// Classify a failure raised while reading `table`.
    ///
    /// Unlike the plain conversion, malformed contents count as a schema problem.
    pub fn reading(table: TableName, err: StorageError) -> Self {
        match err {
            StorageError::Malformed { message } => LoadError::SchemaMismatch {
                table,
                detail: message,
            },
            other => other.into(),
        }
    }
}

/// Kinds of entity an operation may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A driver id.
    Driver,
    /// A constructor team id.
    Team,
    /// A fantasy player id.
    Player,
    /// An open-ended pick of a player for a driver.
    OpenPick,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Driver => "driver",
            EntityKind::Team => "team",
            EntityKind::Player => "player",
            EntityKind::OpenPick => "open pick",
        })
    }
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable or locked by another process.
    #[error("league store unavailable")]
    StoreUnavailable(#[source] StorageError),
    /// The store layout does not match what the engine expects.
    #[error("schema mismatch in table `{table}`: {detail}")]
    SchemaMismatch {
        /// Table being read.
        table: TableName,
        /// What did not match.
        detail: String,
    },
    /// Referenced race does not exist.
    #[error("unknown race `{0}`")]
    UnknownEvent(String),
    /// Referenced driver, team, player or pick does not exist.
    #[error("unknown {kind} `{id}`")]
    UnknownEntity {
        /// Kind of entity referenced.
        kind: EntityKind,
        /// Identifier that was not found.
        id: String,
    },
    /// Invalid input provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ServiceError {
    /// Whether the caller may retry once the store is released.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ServiceError::StoreUnavailable(_))
    }

    pub(crate) fn unknown(kind: EntityKind, id: impl fmt::Display) -> Self {
        ServiceError::UnknownEntity {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<LoadError> for ServiceError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::StoreUnavailable(source) => ServiceError::StoreUnavailable(source),
            LoadError::SchemaMismatch { table, detail } => {
                ServiceError::SchemaMismatch { table, detail }
            }
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        LoadError::from(err).into()
    }
}
