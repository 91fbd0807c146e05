//! Mutations of the league tables. Each one validates its references against a
//! fresh view before touching the store.

use time::Date;
use tracing::{info, warn};

use crate::{
    dao::{
        models::{
            DriverAssignment, DriverId, PlayerPick, RaceResult, RaceStatus, Record, append_records,
        },
        table::{Cell, TableData, TableName},
    },
    error::{EntityKind, ServiceError},
    state::{NormalizedView, ScoringSession},
};

/// Register a new player holding `driver_ids` from `from_date` on.
pub fn add_player(
    session: &mut ScoringSession,
    player_id: &str,
    player_name: &str,
    driver_ids: &[DriverId],
    from_date: Date,
) -> Result<(), ServiceError> {
    let (player_id, player_name) = (player_id.trim(), player_name.trim());
    if player_id.is_empty() || player_name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "player id and name must not be empty".into(),
        ));
    }
    if driver_ids.is_empty() {
        return Err(ServiceError::InvalidInput("a player needs at least one driver".into()));
    }

    let view = session.get_view(true)?;
    if view.snapshot.has_player(player_id) {
        return Err(ServiceError::InvalidInput(format!(
            "player `{player_id}` already exists"
        )));
    }
    for driver_id in driver_ids {
        require_driver(view, driver_id.as_str())?;
    }

    let picks: Vec<PlayerPick> = driver_ids
        .iter()
        .map(|driver_id| PlayerPick {
            player_id: player_id.into(),
            player_name: player_name.to_string(),
            driver_id: driver_id.clone(),
            from_date: Some(from_date),
            to_date: None,
        })
        .collect();
    append_to(session, TableName::PlayerPicks, &picks)?;

    info!(player_id, drivers = picks.len(), "player added");
    Ok(())
}

/// Append a single pick.
pub fn add_player_pick(session: &mut ScoringSession, pick: PlayerPick) -> Result<(), ServiceError> {
    if pick.player_id.as_str().is_empty() {
        return Err(ServiceError::InvalidInput("player id must not be empty".into()));
    }
    if let (Some(from), Some(to)) = (pick.from_date, pick.to_date) {
        if to < from {
            return Err(ServiceError::InvalidInput(format!(
                "pick ends ({to}) before it starts ({from})"
            )));
        }
    }
    let view = session.get_view(true)?;
    require_driver(view, pick.driver_id.as_str())?;

    append_to(session, TableName::PlayerPicks, [&pick])?;
    info!(
        player_id = %pick.player_id,
        driver_id = %pick.driver_id,
        "player pick added"
    );
    Ok(())
}

/// Swap one of a player's drivers from `effective_date` on.
///
/// The open pick for `old_driver` ends the day before; a new open pick for
/// `new_driver` starts on `effective_date`.
pub fn change_driver(
    session: &mut ScoringSession,
    player_id: &str,
    old_driver: &str,
    new_driver: &str,
    effective_date: Date,
) -> Result<(), ServiceError> {
    let view = session.get_view(true)?;
    if !view.snapshot.has_player(player_id) {
        return Err(ServiceError::unknown(EntityKind::Player, player_id));
    }
    require_driver(view, new_driver)?;
    let Some(open_pick) = view.snapshot.picks.iter().find(|pick| {
        pick.player_id.as_str() == player_id && pick.driver_id.as_str() == old_driver && pick.is_open()
    }) else {
        return Err(ServiceError::unknown(
            EntityKind::OpenPick,
            format!("{player_id}/{old_driver}"),
        ));
    };
    let Some(closing_date) = effective_date.previous_day() else {
        return Err(ServiceError::InvalidInput(format!(
            "cannot change driver effective {effective_date}"
        )));
    };
    if open_pick.from_date.is_some_and(|from| closing_date < from) {
        return Err(ServiceError::InvalidInput(format!(
            "change effective {effective_date} precedes the start of the current pick"
        )));
    }
    let replacement = PlayerPick {
        player_id: open_pick.player_id.clone(),
        player_name: open_pick.player_name.clone(),
        driver_id: new_driver.into(),
        from_date: Some(effective_date),
        to_date: None,
    };

    let mut table = session.store().read_table(TableName::PlayerPicks)?;
    let to_column = table.ensure_column("ToDate");
    let driver_rows: Vec<usize> = table.rows_matching("PlayerID", player_id).collect();
    let Some(row) = driver_rows.into_iter().find(|row| {
        table.column_index("DriverID").is_some_and(|column| {
            table.cell(*row, column).as_text().as_deref() == Some(old_driver)
        }) && table.cell(*row, to_column).as_date().is_none()
    }) else {
        return Err(ServiceError::unknown(
            EntityKind::OpenPick,
            format!("{player_id}/{old_driver}"),
        ));
    };
    table.set_cell(row, to_column, Cell::Date(closing_date));
    append_records(&mut table, [&replacement]);
    session.write_table(TableName::PlayerPicks, table)?;

    info!(
        player_id,
        old_driver,
        new_driver,
        effective = %effective_date,
        "player driver changed"
    );
    Ok(())
}

/// Record that `substitute` raced for `team_id` in place of `original` at `race_id`.
pub fn record_substitution(
    session: &mut ScoringSession,
    race_id: &str,
    substitute: &str,
    team_id: &str,
    original: &str,
) -> Result<(), ServiceError> {
    if substitute == original {
        return Err(ServiceError::InvalidInput(format!(
            "driver `{original}` cannot substitute for themselves"
        )));
    }
    let view = session.get_view(true)?;
    require_race(view, race_id)?;
    require_driver(view, substitute)?;
    require_driver(view, original)?;
    if view.snapshot.team(team_id).is_none() {
        return Err(ServiceError::unknown(EntityKind::Team, team_id));
    }
    if let Some(existing) = view.snapshot.substitutions_for(race_id, original).next() {
        warn!(
            race_id,
            driver_id = original,
            existing = %existing.driver_id,
            substitute,
            "driver already has a substitution for this race; scoring uses the first"
        );
    }

    let assignment = DriverAssignment {
        race_id: race_id.into(),
        driver_id: substitute.into(),
        team_id: Some(team_id.into()),
        substituted_for: original.into(),
    };
    append_to(session, TableName::DriverAssignments, [&assignment])?;
    info!(race_id, substitute, original, team_id, "substitution recorded");
    Ok(())
}

/// Store the season-to-date points of each driver after `race_id` and mark
/// the race completed, in one store write.
pub fn record_race_results(
    session: &mut ScoringSession,
    race_id: &str,
    results: &[(DriverId, f64)],
) -> Result<(), ServiceError> {
    if let Some((driver_id, _)) = results.iter().find(|(_, points)| !points.is_finite()) {
        return Err(ServiceError::InvalidInput(format!(
            "points for `{driver_id}` are not a number"
        )));
    }
    let view = session.get_view(true)?;
    require_race(view, race_id)?;
    for (driver_id, _) in results {
        require_driver(view, driver_id.as_str())?;
    }

    let mut race_results = session.store().read_table(TableName::RaceResults)?;
    let stale: Vec<usize> = race_results.rows_matching("RaceID", race_id).collect();
    remove_rows(&mut race_results, &stale);
    let records: Vec<RaceResult> = results
        .iter()
        .map(|(driver_id, points)| RaceResult {
            race_id: race_id.into(),
            driver_id: driver_id.clone(),
            points: *points,
        })
        .collect();
    append_records(&mut race_results, &records);

    let mut races = session.store().read_table(TableName::Races)?;
    let status = races.ensure_column("Status");
    let race_rows: Vec<usize> = races.rows_matching("RaceID", race_id).collect();
    for row in race_rows {
        races.set_cell(row, status, RaceStatus::Completed.as_str().into());
    }

    session.write_tables(vec![
        (TableName::RaceResults, race_results),
        (TableName::Races, races),
    ])?;
    info!(
        race_id,
        drivers = records.len(),
        replaced = stale.len(),
        "race results recorded"
    );
    Ok(())
}

/// Replace a whole table from outside the engine.
pub fn write_table(
    session: &mut ScoringSession,
    table: TableName,
    data: TableData,
) -> Result<(), ServiceError> {
    let rows = data.rows.len();
    session.write_table(table, data)?;
    info!(table = %table, rows, "table replaced");
    Ok(())
}

fn require_race(view: &NormalizedView, race_id: &str) -> Result<(), ServiceError> {
    match view.snapshot.race(race_id) {
        Some(_) => Ok(()),
        None => Err(ServiceError::UnknownEvent(race_id.to_string())),
    }
}

fn require_driver(view: &NormalizedView, driver_id: &str) -> Result<(), ServiceError> {
    match view.snapshot.driver(driver_id) {
        Some(_) => Ok(()),
        None => Err(ServiceError::unknown(EntityKind::Driver, driver_id)),
    }
}

fn append_to<'a, R>(
    session: &mut ScoringSession,
    table: TableName,
    records: impl IntoIterator<Item = &'a R>,
) -> Result<(), ServiceError>
where
    R: Record + 'a,
{
    let mut data = session.store().read_table(table)?;
    append_records(&mut data, records);
    session.write_table(table, data)
}

fn remove_rows(data: &mut TableData, rows: &[usize]) {
    let mut index = 0;
    data.rows.retain(|_| {
        let keep = !rows.contains(&index);
        index += 1;
        keep
    });
}
