use std::{fs, path::Path};

use league_scoring::{
    config::LeagueRules,
    dao::{league_store::LeagueStore, models::DriverId, table::TableName},
    error::ServiceError,
    services::{league_service, scoring_service, season, standings_service},
    state::ScoringSession,
};
use time::macros::date;
use tempfile::tempdir;

fn backups(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().contains("_backup_"))
        .count()
}

/// Seed a season, register one player and score the opening race.
fn play_opening_race(session: &mut ScoringSession) {
    let setup = season::initialize_season(session, &season::season_2025()).unwrap();
    assert_eq!(setup.created.len(), TableName::ALL.len());
    assert_eq!(setup.seeded.len(), 3);

    league_service::add_player(
        session,
        "P1",
        "Alice",
        &[DriverId::from("VER"), DriverId::from("BEA")],
        date!(2025 - 01 - 01),
    )
    .unwrap();
    league_service::record_race_results(
        session,
        "AUS",
        &[(DriverId::from("VER"), 18.0), (DriverId::from("BEA"), 0.0)],
    )
    .unwrap();

    let scored = scoring_service::score_event(session, "AUS").unwrap();
    assert_eq!(scored.rows[0].total, 18.0);
}

fn assert_reloaded(session: &mut ScoringSession) {
    let view = session.get_view(true).unwrap();
    assert_eq!(view.snapshot.races.len(), 24);
    assert_eq!(view.player_total("P1"), 18.0);
    let standings = standings_service::standings(view);
    assert_eq!(standings[0].name, "Alice");
}

#[cfg(feature = "json-store")]
mod json {
    use league_scoring::dao::league_store::json::{JsonLeagueStore, JsonStoreConfig};

    use super::*;

    fn open(path: &Path) -> ScoringSession {
        let store = JsonLeagueStore::open(JsonStoreConfig::new(path.join("league.json")));
        ScoringSession::new(Box::new(store), LeagueRules::default())
    }

    #[test]
    fn league_survives_a_reopen() {
        let dir = tempdir().unwrap();
        play_opening_race(&mut open(dir.path()));

        assert_reloaded(&mut open(dir.path()));
    }

    #[test]
    fn writes_back_up_the_previous_file() {
        let dir = tempdir().unwrap();
        let mut session = open(dir.path());
        play_opening_race(&mut session);
        let before = backups(dir.path());
        assert!(before > 0);

        let backup = session.backup().unwrap().unwrap();

        assert!(backup.exists());
        assert_eq!(backups(dir.path()), before + 1);
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempdir().unwrap();

        let err = open(dir.path()).get_view(false).unwrap_err();

        assert!(matches!(err, ServiceError::StoreUnavailable(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn lock_marker_blocks_the_store() {
        let dir = tempdir().unwrap();
        let mut session = open(dir.path());
        play_opening_race(&mut session);
        fs::write(dir.path().join("league.json.lock"), b"").unwrap();

        let err = open(dir.path()).get_view(true).unwrap_err();
        assert!(err.is_recoverable());
        let err = scoring_service::score_event(&mut session, "AUS").unwrap_err();
        assert!(err.is_recoverable());
        assert!(session.store().health_check().is_err());
    }
}

#[cfg(feature = "xlsx-store")]
mod xlsx {
    use league_scoring::dao::league_store::xlsx::{XlsxLeagueStore, XlsxStoreConfig};

    use super::*;

    fn open(path: &Path) -> ScoringSession {
        let store = XlsxLeagueStore::open(XlsxStoreConfig::new(path.join("league.xlsx")));
        ScoringSession::new(Box::new(store), LeagueRules::default())
    }

    #[test]
    fn league_survives_a_reopen() {
        let dir = tempdir().unwrap();
        play_opening_race(&mut open(dir.path()));

        assert_reloaded(&mut open(dir.path()));
        assert!(backups(dir.path()) > 0);
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempdir().unwrap();

        let err = open(dir.path()).get_view(false).unwrap_err();

        assert!(matches!(err, ServiceError::StoreUnavailable(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn lock_marker_blocks_the_store() {
        let dir = tempdir().unwrap();
        play_opening_race(&mut open(dir.path()));
        fs::write(dir.path().join("league.xlsx.lock"), b"").unwrap();

        let err = open(dir.path()).get_view(true).unwrap_err();
        assert!(err.is_recoverable());
    }
}
