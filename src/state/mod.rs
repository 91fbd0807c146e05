/// View cache.
pub mod cache;
/// Typed raw tables.
pub mod snapshot;
/// Normalized view.
pub mod view;

use tracing::{debug, info};

use crate::{
    config::{AppConfig, LeagueRules, StoreBackend},
    dao::{
        league_store::LeagueStore,
        table::{TableData, TableName},
    },
    error::ServiceError,
    services::loader,
};

pub use self::{cache::ViewCache, snapshot::Snapshot, view::NormalizedView};

/// Single-writer handle over a league store and its cached normalized view.
///
/// Every write issued through the session invalidates the cached view.
pub struct ScoringSession {
    store: Box<dyn LeagueStore>,
    cache: ViewCache,
    rules: LeagueRules,
}

impl ScoringSession {
    /// Session over `store` scoring with `rules`.
    pub fn new(store: Box<dyn LeagueStore>, rules: LeagueRules) -> Self {
        Self {
            store,
            cache: ViewCache::new(),
            rules,
        }
    }

    /// Open the store described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let store = open_store(config)?;
        info!(
            backend = ?config.store.backend,
            store = %store.describe(),
            "league store opened"
        );
        Ok(Self::new(store, config.rules.clone()))
    }

    /// Scoring and roster rules.
    pub fn rules(&self) -> &LeagueRules {
        &self.rules
    }

    /// Underlying store.
    pub fn store(&self) -> &dyn LeagueStore {
        self.store.as_ref()
    }

    /// Normalized view, rebuilt from the store when stale or when `force_reload` is set.
    pub fn get_view(&mut self, force_reload: bool) -> Result<&NormalizedView, ServiceError> {
        let store = self.store.as_ref();
        self.cache
            .get_or_load(force_reload, || loader::load_view(store))
            .map_err(ServiceError::from)
    }

    /// Whether the next `get_view(false)` is served from the cache.
    pub fn is_view_valid(&self) -> bool {
        self.cache.is_valid()
    }

    /// Force the next `get_view` to reload.
    pub fn invalidate_view(&mut self) {
        self.cache.invalidate();
    }

    /// Replace one table and invalidate the cached view.
    pub fn write_table(&mut self, table: TableName, data: TableData) -> Result<(), ServiceError> {
        debug!(table = %table, rows = data.rows.len(), "writing table");
        let outcome = self.store.write_table(table, data);
        self.finish_write(outcome)
    }

    /// Replace several tables in one store write and invalidate the cached view.
    pub fn write_tables(&mut self, tables: Vec<(TableName, TableData)>) -> Result<(), ServiceError> {
        let outcome = self.store.write_tables(tables);
        self.finish_write(outcome)
    }

    /// Explicit store backup.
    pub fn backup(&self) -> Result<Option<std::path::PathBuf>, ServiceError> {
        Ok(self.store.backup()?)
    }

    /// Create any table missing from the store.
    pub fn initialize_store(&mut self) -> Result<Vec<TableName>, ServiceError> {
        let outcome = crate::dao::league_store::initialize_store(self.store.as_mut());
        self.finish_write(outcome)
    }

    fn finish_write<T>(
        &mut self,
        outcome: Result<T, crate::dao::storage::StorageError>,
    ) -> Result<T, ServiceError> {
        // A failed write may still have touched the store.
        self.cache.invalidate();
        Ok(outcome?)
    }
}

fn open_store(config: &AppConfig) -> Result<Box<dyn LeagueStore>, ServiceError> {
    let store = &config.store;
    match store.backend {
        #[cfg(feature = "json-store")]
        StoreBackend::Json => {
            use crate::dao::league_store::json::{JsonLeagueStore, JsonStoreConfig};
            Ok(Box::new(JsonLeagueStore::open(
                JsonStoreConfig::new(&store.path).with_backups(store.backups.clone()),
            )))
        }
        #[cfg(feature = "xlsx-store")]
        StoreBackend::Xlsx => {
            use crate::dao::league_store::xlsx::{XlsxLeagueStore, XlsxStoreConfig};
            Ok(Box::new(XlsxLeagueStore::open(
                XlsxStoreConfig::new(&store.path).with_backups(store.backups.clone()),
            )))
        }
        #[allow(unreachable_patterns)]
        backend => Err(ServiceError::InvalidInput(format!(
            "store backend {backend:?} is not compiled in"
        ))),
    }
}
