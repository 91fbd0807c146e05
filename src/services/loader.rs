use std::hash::Hash;

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::{
    dao::{
        league_store::LeagueStore,
        models::{Driver, Race, Record, Team, decode_rows},
        storage::StorageError,
        table::{TableData, TableName},
    },
    error::LoadError,
    services::normalizer::normalize,
    state::{NormalizedView, Snapshot},
};

/// Read all seven tables into a typed snapshot.
///
/// Either every table loads or the whole load fails. Rows that cannot be
/// decoded are logged and skipped.
pub fn load_raw(store: &dyn LeagueStore) -> Result<Snapshot, LoadError> {
    // An unreadable store document is reported against the first table.
    let mut tables = store
        .read_tables(&TableName::ALL)
        .map_err(|err| LoadError::reading(TableName::ALL[0], err))?;
    let snapshot = Snapshot {
        races: keyed(read_records(&mut tables)?, |race: &Race| race.id.clone()),
        drivers: keyed(read_records(&mut tables)?, |driver: &Driver| driver.id.clone()),
        teams: keyed(read_records(&mut tables)?, |team: &Team| team.id.clone()),
        picks: read_records(&mut tables)?,
        assignments: read_records(&mut tables)?,
        race_results: read_records(&mut tables)?,
        player_results: read_records(&mut tables)?,
    };

    info!(
        store = %store.describe(),
        races = snapshot.races.len(),
        drivers = snapshot.drivers.len(),
        teams = snapshot.teams.len(),
        picks = snapshot.picks.len(),
        assignments = snapshot.assignments.len(),
        race_results = snapshot.race_results.len(),
        player_results = snapshot.player_results.len(),
        "league tables loaded"
    );
    Ok(snapshot)
}

/// Load and normalize in one step.
pub fn load_view(store: &dyn LeagueStore) -> Result<NormalizedView, LoadError> {
    load_raw(store).map(normalize)
}

fn read_records<R: Record>(
    tables: &mut IndexMap<TableName, TableData>,
) -> Result<Vec<R>, LoadError> {
    let table = R::TABLE;
    let data = tables
        .shift_remove(&table)
        .ok_or(StorageError::MissingTable { table })?;
    let decoded = decode_rows::<R>(&data).map_err(|column| LoadError::SchemaMismatch {
        table,
        detail: format!("required column `{column}` is missing"),
    })?;

    for (row, err) in &decoded.rejected {
        warn!(table = %table, row = row + 1, error = %err, "skipping malformed row");
    }
    Ok(decoded.records)
}

/// Index records by id, keeping the first of any duplicates.
fn keyed<K, R>(records: Vec<R>, id: impl Fn(&R) -> K) -> IndexMap<K, R>
where
    K: Hash + Eq + std::fmt::Display,
{
    let mut map = IndexMap::with_capacity(records.len());
    for record in records {
        let key = id(&record);
        if map.contains_key(&key) {
            warn!(id = %key, "ignoring duplicate reference row");
            continue;
        }
        map.insert(key, record);
    }
    map
}
