use std::path::PathBuf;

use calamine::{Reader, Xlsx, open_workbook};
use indexmap::IndexMap;
use rust_xlsxwriter::Workbook;
use tracing::{debug, warn};

use crate::dao::{
    league_store::{BackupPolicy, LeagueStore, file_guard::FileGuard},
    storage::{StorageError, StorageResult},
    table::{TableData, TableName},
};

use super::{
    cells,
    error::{XlsxDaoError, XlsxResult},
};

/// Runtime configuration describing where the league workbook lives.
#[derive(Debug, Clone)]
pub struct XlsxStoreConfig {
    /// Workbook location.
    pub path: PathBuf,
    /// Backup-before-write policy.
    pub backups: BackupPolicy,
}

impl XlsxStoreConfig {
    /// Configuration for the workbook at `path`, backing up next to it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backups: BackupPolicy::default(),
        }
    }

    /// Override where backups are written before each save.
    pub fn with_backups(mut self, backups: BackupPolicy) -> Self {
        self.backups = backups;
        self
    }
}

/// League store persisted as one workbook with a sheet per table.
#[derive(Debug, Clone)]
pub struct XlsxLeagueStore {
    guard: FileGuard,
}

impl XlsxLeagueStore {
    /// Store backed by the workbook in `config`. Nothing is read until first use.
    pub fn open(config: XlsxStoreConfig) -> Self {
        Self {
            guard: FileGuard::new(config.path, config.backups),
        }
    }

    fn open_workbook(&self) -> XlsxResult<Xlsx<std::io::BufReader<std::fs::File>>> {
        open_workbook(self.guard.path()).map_err(|source| XlsxDaoError::Open {
            path: self.guard.path().to_path_buf(),
            source,
        })
    }

    /// Every sheet currently in the workbook, keyed by sheet name.
    fn read_all_sheets(&self) -> XlsxResult<IndexMap<String, TableData>> {
        if !self.guard.path().exists() {
            return Ok(IndexMap::new());
        }
        let mut workbook = self.open_workbook()?;
        let mut sheets = IndexMap::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|source| XlsxDaoError::Sheet {
                    sheet: name.clone(),
                    source,
                })?;
            if TableName::from_name(&name).is_none() {
                warn!(sheet = %name, "keeping unrecognised sheet");
            }
            sheets.insert(name, cells::table_from_range(&range));
        }
        Ok(sheets)
    }

    fn save(&self, sheets: &IndexMap<String, TableData>) -> StorageResult<()> {
        let mut workbook = Workbook::new();
        for (name, table) in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(name).map_err(XlsxDaoError::from)?;
            cells::write_table(worksheet, table).map_err(XlsxDaoError::from)?;
        }
        self.guard.replace_with(|temporary| {
            workbook
                .save(temporary)
                .map_err(|err| XlsxDaoError::from(err).into())
        })
    }
}

impl LeagueStore for XlsxLeagueStore {
    fn read_table(&self, table: TableName) -> StorageResult<TableData> {
        self.guard.ensure_unlocked()?;
        let mut workbook = self.open_workbook()?;
        if !workbook.sheet_names().iter().any(|name| name == table.as_str()) {
            return Err(StorageError::MissingTable { table });
        }
        let range = workbook
            .worksheet_range(table.as_str())
            .map_err(|source| XlsxDaoError::Sheet {
                sheet: table.as_str().to_string(),
                source,
            })?;
        Ok(cells::table_from_range(&range))
    }

    fn read_tables(&self, tables: &[TableName]) -> StorageResult<IndexMap<TableName, TableData>> {
        self.guard.ensure_unlocked()?;
        let mut workbook = self.open_workbook()?;
        let present = workbook.sheet_names();
        let mut read = IndexMap::with_capacity(tables.len());
        for table in tables {
            if !present.iter().any(|name| name == table.as_str()) {
                continue;
            }
            let range = workbook
                .worksheet_range(table.as_str())
                .map_err(|source| XlsxDaoError::Sheet {
                    sheet: table.as_str().to_string(),
                    source,
                })?;
            read.insert(*table, cells::table_from_range(&range));
        }
        Ok(read)
    }

    fn write_table(&mut self, table: TableName, data: TableData) -> StorageResult<()> {
        self.write_tables(vec![(table, data)])
    }

    fn write_tables(&mut self, tables: Vec<(TableName, TableData)>) -> StorageResult<()> {
        self.guard.ensure_unlocked()?;
        let mut sheets = self.read_all_sheets()?;
        self.guard.backup()?;

        for (table, data) in tables {
            debug!(table = %table, rows = data.rows.len(), "writing sheet");
            sheets.insert(table.as_str().to_string(), data);
        }

        self.save(&sheets)
    }

    fn health_check(&self) -> StorageResult<()> {
        self.guard.ensure_readable()?;
        self.open_workbook().map(drop).map_err(StorageError::from)
    }

    fn backup(&self) -> StorageResult<Option<PathBuf>> {
        self.guard.ensure_unlocked()?;
        self.guard.backup()
    }

    fn describe(&self) -> String {
        self.guard.path().display().to_string()
    }
}
