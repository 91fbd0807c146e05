use indexmap::IndexMap;

use crate::dao::{
    league_store::LeagueStore,
    storage::{StorageError, StorageResult},
    table::{TableData, TableName},
};

/// League store kept entirely in process memory.
///
/// Useful for embedding and for exercising failure paths: the store can be
/// flagged as locked, and tables can be dropped to simulate a broken file.
#[derive(Debug, Clone, Default)]
pub struct MemoryLeagueStore {
    tables: IndexMap<TableName, TableData>,
    locked: bool,
    writes: usize,
}

impl MemoryLeagueStore {
    /// A store with every table present and empty.
    pub fn new() -> Self {
        let tables = TableName::ALL
            .into_iter()
            .map(|table| (table, TableData::empty(table)))
            .collect();
        Self {
            tables,
            locked: false,
            writes: 0,
        }
    }

    /// A store with no tables at all.
    pub fn blank() -> Self {
        Self::default()
    }

    /// Simulate another process holding the store open.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Remove a table, as if the file had been edited by hand.
    pub fn drop_table(&mut self, table: TableName) -> Option<TableData> {
        self.tables.shift_remove(&table)
    }

    /// Number of successful write calls so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    fn ensure_unlocked(&self) -> StorageResult<()> {
        if self.locked {
            return Err(StorageError::Locked {
                path: "memory".into(),
            });
        }
        Ok(())
    }
}

impl LeagueStore for MemoryLeagueStore {
    fn read_table(&self, table: TableName) -> StorageResult<TableData> {
        self.ensure_unlocked()?;
        self.tables
            .get(&table)
            .cloned()
            .ok_or(StorageError::MissingTable { table })
    }

    fn write_table(&mut self, table: TableName, data: TableData) -> StorageResult<()> {
        self.ensure_unlocked()?;
        self.tables.insert(table, data);
        self.writes += 1;
        Ok(())
    }

    fn write_tables(&mut self, tables: Vec<(TableName, TableData)>) -> StorageResult<()> {
        self.ensure_unlocked()?;
        for (table, data) in tables {
            self.tables.insert(table, data);
        }
        self.writes += 1;
        Ok(())
    }

    fn health_check(&self) -> StorageResult<()> {
        self.ensure_unlocked()
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::league_store::initialize_store;

    #[test]
    fn locked_store_refuses_reads_and_writes() {
        let mut store = MemoryLeagueStore::new();
        store.set_locked(true);

        assert!(matches!(
            store.read_table(TableName::Races),
            Err(StorageError::Locked { .. })
        ));
        assert!(
            store
                .write_table(TableName::Races, TableData::empty(TableName::Races))
                .is_err()
        );
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn missing_tables_are_left_out_of_bulk_reads() {
        let mut store = MemoryLeagueStore::new();
        store.drop_table(TableName::Teams);

        let read = store.read_tables(&TableName::ALL).unwrap();

        assert_eq!(read.len(), 6);
        assert!(!read.contains_key(&TableName::Teams));
    }

    #[test]
    fn initialize_creates_only_missing_tables() {
        let mut store = MemoryLeagueStore::blank();
        store
            .write_table(TableName::Teams, TableData::empty(TableName::Teams))
            .unwrap();

        let created = initialize_store(&mut store).unwrap();

        assert_eq!(created.len(), 6);
        assert!(!created.contains(&TableName::Teams));
        for table in TableName::ALL {
            assert!(store.read_table(table).is_ok());
        }
        assert!(initialize_store(&mut store).unwrap().is_empty());
    }
}
