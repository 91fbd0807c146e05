/// Single JSON document backend.
#[cfg(feature = "json-store")]
pub mod json;
/// In-process backend.
pub mod memory;
/// Workbook backend.
#[cfg(feature = "xlsx-store")]
pub mod xlsx;

mod file_guard;

use std::path::PathBuf;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::dao::{
    storage::{StorageError, StorageResult},
    table::{TableData, TableName},
};

pub use self::file_guard::BackupPolicy;

/// Abstraction over the persistence layer holding the seven league tables.
///
/// Implementations own file access, locking and backup-before-write; callers
/// only ever exchange whole tables.
pub trait LeagueStore {
    /// Read one table in full.
    fn read_table(&self, table: TableName) -> StorageResult<TableData>;

    /// Read several tables from a single read of the store.
    ///
    /// Tables absent from the store are left out of the result.
    fn read_tables(&self, tables: &[TableName]) -> StorageResult<IndexMap<TableName, TableData>> {
        let mut read = IndexMap::with_capacity(tables.len());
        for table in tables {
            match self.read_table(*table) {
                Ok(data) => {
                    read.insert(*table, data);
                }
                Err(StorageError::MissingTable { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(read)
    }

    /// Replace one table in full.
    fn write_table(&mut self, table: TableName, data: TableData) -> StorageResult<()>;

    /// Replace several tables at once; either every table is written or none is.
    fn write_tables(&mut self, tables: Vec<(TableName, TableData)>) -> StorageResult<()> {
        for (table, data) in tables {
            self.write_table(table, data)?;
        }
        Ok(())
    }

    /// Confirm the store can currently be opened.
    fn health_check(&self) -> StorageResult<()>;

    /// Copy the store aside, returning where the copy went.
    fn backup(&self) -> StorageResult<Option<PathBuf>> {
        Ok(None)
    }

    /// Human readable location of the store, for logs.
    fn describe(&self) -> String;
}

/// Create every missing table with its canonical header.
///
/// A store file that does not exist yet is created. Returns the tables that
/// had to be created.
pub fn initialize_store(store: &mut dyn LeagueStore) -> StorageResult<Vec<TableName>> {
    let mut created = Vec::new();
    for table in TableName::ALL {
        match store.read_table(table) {
            Ok(_) => {}
            Err(StorageError::MissingTable { .. }) => created.push(table),
            // Unreadable stores surface again on write; a missing file is created there.
            Err(StorageError::Unavailable { message, .. }) => {
                debug!(store = %store.describe(), %message, "store not readable, creating");
                created.push(table);
            }
            Err(err) => return Err(err),
        }
    }

    if !created.is_empty() {
        store.write_tables(
            created
                .iter()
                .map(|table| (*table, TableData::empty(*table)))
                .collect(),
        )?;
        info!(
            store = %store.describe(),
            tables = ?created,
            "created missing league tables"
        );
    }

    Ok(created)
}
