use std::{fs, io::ErrorKind, path::PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use crate::dao::{
    league_store::{LeagueStore, file_guard::FileGuard},
    storage::{StorageError, StorageResult},
    table::{TableData, TableName},
};

use super::{
    config::JsonStoreConfig,
    document::{JsonTable, LeagueDocument},
    error::{JsonDaoError, JsonResult},
};

/// League store persisted as a single JSON document.
#[derive(Debug, Clone)]
pub struct JsonLeagueStore {
    guard: FileGuard,
}

impl JsonLeagueStore {
    /// Store backed by the file in `config`. Nothing is read until first use.
    pub fn open(config: JsonStoreConfig) -> Self {
        Self {
            guard: FileGuard::new(config.path, config.backups),
        }
    }

    fn read_document(&self) -> JsonResult<LeagueDocument> {
        let path = self.guard.path();
        let contents = fs::read_to_string(path).map_err(|source| JsonDaoError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| JsonDaoError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The current document, or an empty one when the file has not been created yet.
    fn read_document_for_update(&self) -> JsonResult<LeagueDocument> {
        match self.read_document() {
            Err(JsonDaoError::Read { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Ok(LeagueDocument::new())
            }
            other => other,
        }
    }

    fn write_document(&self, document: &LeagueDocument) -> StorageResult<()> {
        let encoded = serde_json::to_vec_pretty(document)
            .map_err(|source| JsonDaoError::Encode { source })?;
        self.guard.replace_with(|temporary| {
            fs::write(temporary, &encoded)
                .map_err(|source| {
                    JsonDaoError::Write {
                        path: temporary.to_path_buf(),
                        source,
                    }
                    .into()
                })
        })
    }
}

impl LeagueStore for JsonLeagueStore {
    fn read_table(&self, table: TableName) -> StorageResult<TableData> {
        self.guard.ensure_unlocked()?;
        let mut document = self.read_document()?;
        document
            .shift_remove(table.as_str())
            .map(TableData::from)
            .ok_or(StorageError::MissingTable { table })
    }

    fn read_tables(&self, tables: &[TableName]) -> StorageResult<IndexMap<TableName, TableData>> {
        self.guard.ensure_unlocked()?;
        let mut document = self.read_document()?;
        Ok(tables
            .iter()
            .filter_map(|table| {
                document
                    .shift_remove(table.as_str())
                    .map(|stored| (*table, TableData::from(stored)))
            })
            .collect())
    }

    fn write_table(&mut self, table: TableName, data: TableData) -> StorageResult<()> {
        self.write_tables(vec![(table, data)])
    }

    fn write_tables(&mut self, tables: Vec<(TableName, TableData)>) -> StorageResult<()> {
        self.guard.ensure_unlocked()?;
        let mut document = self.read_document_for_update()?;
        self.guard.backup()?;

        for (table, data) in tables {
            debug!(table = %table, rows = data.rows.len(), "writing table");
            document.insert(table.as_str().to_string(), JsonTable::from(data));
        }

        self.write_document(&document)
    }

    fn health_check(&self) -> StorageResult<()> {
        self.guard.ensure_readable()
    }

    fn backup(&self) -> StorageResult<Option<PathBuf>> {
        self.guard.ensure_unlocked()?;
        self.guard.backup()
    }

    fn describe(&self) -> String {
        self.guard.path().display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::dao::table::Cell;

    #[test]
    fn tables_are_read_from_one_document() {
        let dir = tempdir().unwrap();
        let mut store = JsonLeagueStore::open(JsonStoreConfig::new(dir.path().join("league.json")));
        let mut teams = TableData::empty(TableName::Teams);
        teams.rows.push(vec![Cell::from("RBR"), Cell::from("Red Bull Racing")]);
        store
            .write_tables(vec![
                (TableName::Teams, teams.clone()),
                (TableName::Races, TableData::empty(TableName::Races)),
            ])
            .unwrap();

        let read = store
            .read_tables(&[TableName::Races, TableName::Teams, TableName::Drivers])
            .unwrap();

        assert_eq!(read.len(), 2);
        assert_eq!(read[&TableName::Teams], teams);
        assert!(!read.contains_key(&TableName::Drivers));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempdir().unwrap();
        let store = JsonLeagueStore::open(JsonStoreConfig::new(dir.path().join("absent.json")));

        let err = store.read_tables(&TableName::ALL).unwrap_err();

        assert!(err.is_unavailable());
    }
}
