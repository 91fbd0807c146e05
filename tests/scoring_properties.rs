use league_scoring::{
    config::LeagueRules,
    dao::{
        league_store::{LeagueStore, memory::MemoryLeagueStore},
        models::{
            Driver, DriverAssignment, PlayerPick, Race, RaceId, RaceResult, RaceStatus, Team,
            encode_rows,
        },
        table::TableName,
    },
    services::{
        league_service, loader,
        normalizer::{self, fold_deltas},
        scoring_service, standings_service,
    },
    state::ScoringSession,
};
use time::{Date, macros::date};

fn race(id: &str, day: Date) -> Race {
    Race {
        id: id.into(),
        name: format!("{id} Grand Prix"),
        date: day,
        status: RaceStatus::Completed,
    }
}

fn driver(id: &str, team: &str, credits: u32) -> Driver {
    Driver {
        id: id.into(),
        name: id.to_string(),
        default_team: Some(team.into()),
        credits,
    }
}

fn result(race_id: &str, driver_id: &str, points: f64) -> RaceResult {
    RaceResult {
        race_id: race_id.into(),
        driver_id: driver_id.into(),
        points,
    }
}

/// Three completed races, ABU being the season final. VER scores 10, 25, 25
/// season-to-date; BEA only scores at ABU.
fn league(races: &[Race]) -> MemoryLeagueStore {
    league_with(
        races,
        &[
            result("AUS", "VER", 10.0),
            result("CHN", "VER", 25.0),
            result("ABU", "VER", 25.0),
            result("ABU", "BEA", 8.0),
        ],
    )
}

fn league_with(races: &[Race], results: &[RaceResult]) -> MemoryLeagueStore {
    let mut store = MemoryLeagueStore::new();
    let drivers = [driver("VER", "RBR", 4), driver("BEA", "HAS", 1)];
    let teams = [
        Team {
            id: "RBR".into(),
            name: "Red Bull Racing".into(),
        },
        Team {
            id: "HAS".into(),
            name: "Haas".into(),
        },
    ];
    let picks = [PlayerPick {
        player_id: "P1".into(),
        player_name: "Alice".into(),
        driver_id: "VER".into(),
        from_date: None,
        to_date: None,
    }];

    store.write_table(TableName::Races, encode_rows(races)).unwrap();
    store.write_table(TableName::Drivers, encode_rows(&drivers)).unwrap();
    store.write_table(TableName::Teams, encode_rows(&teams)).unwrap();
    store.write_table(TableName::PlayerPicks, encode_rows(&picks)).unwrap();
    store.write_table(TableName::RaceResults, encode_rows(results)).unwrap();
    store
}

fn calendar() -> Vec<Race> {
    vec![
        race("AUS", date!(2025 - 03 - 16)),
        race("CHN", date!(2025 - 03 - 23)),
        race("ABU", date!(2025 - 12 - 07)),
    ]
}

fn session_with(store: MemoryLeagueStore) -> ScoringSession {
    ScoringSession::new(Box::new(store), LeagueRules::default())
}

fn score_all(session: &mut ScoringSession) -> Vec<f64> {
    ["AUS", "CHN", "ABU"]
        .into_iter()
        .map(|race_id| {
            let scored = scoring_service::score_event(session, race_id).unwrap();
            scored.rows[0].total
        })
        .collect()
}

#[test]
fn driver_and_player_deltas_sum_to_the_final_cumulative_value() {
    let mut session = session_with(league(&calendar()));
    score_all(&mut session);

    let view = session.get_view(false).unwrap();
    let driver_sum: f64 = view
        .events
        .iter()
        .filter_map(|event| view.driver_points(event.as_str(), "VER"))
        .map(|points| points.delta)
        .sum();
    assert!((driver_sum - view.driver_total("VER")).abs() < 1e-9);
    assert_eq!(view.driver_total("VER"), 25.0);

    let player_sum: f64 = view
        .events
        .iter()
        .filter_map(|event| view.player_points(event.as_str(), "P1"))
        .map(|points| points.delta)
        .sum();
    assert!((player_sum - view.player_total("P1")).abs() < 1e-9);
}

#[test]
fn events_are_sorted_by_date_whatever_the_stored_order() {
    let mut shuffled = calendar();
    shuffled.rotate_left(2);
    assert_eq!(shuffled[0].id.as_str(), "ABU");

    let mut session = session_with(league(&shuffled));
    let view = session.get_view(true).unwrap();

    assert_eq!(
        view.events,
        [RaceId::from("AUS"), RaceId::from("CHN"), RaceId::from("ABU")]
    );
    let deltas: Vec<f64> = view
        .events
        .iter()
        .filter_map(|event| view.driver_points(event.as_str(), "VER"))
        .map(|points| points.delta)
        .collect();
    assert_eq!(deltas, [10.0, 15.0, 0.0]);
}

#[test]
fn differencing_unsorted_events_gives_wrong_deltas() {
    let cumulative = |event: &RaceId| match event.as_str() {
        "AUS" => Some(10.0),
        "CHN" => Some(25.0),
        "ABU" => Some(25.0),
        _ => None,
    };
    let sorted = [RaceId::from("AUS"), RaceId::from("CHN"), RaceId::from("ABU")];
    let unsorted = [RaceId::from("CHN"), RaceId::from("AUS"), RaceId::from("ABU")];

    let sorted: Vec<f64> = fold_deltas(&sorted, cumulative)
        .iter()
        .map(|points| points.delta)
        .collect();
    let unsorted: Vec<f64> = fold_deltas(&unsorted, cumulative)
        .iter()
        .map(|points| points.delta)
        .collect();

    assert_eq!(sorted, [10.0, 15.0, 0.0]);
    assert_eq!(unsorted, [25.0, -15.0, 15.0]);
    assert_ne!(sorted, unsorted);
}

#[test]
fn substitute_delta_replaces_the_original_driver() {
    // VER also scores at ABU, which must not count.
    let mut store = league_with(
        &calendar(),
        &[
            result("AUS", "VER", 10.0),
            result("CHN", "VER", 25.0),
            result("ABU", "VER", 40.0),
            result("ABU", "BEA", 8.0),
        ],
    );
    let assignments = [DriverAssignment {
        race_id: "ABU".into(),
        driver_id: "BEA".into(),
        team_id: Some("RBR".into()),
        substituted_for: "VER".into(),
    }];
    store
        .write_table(TableName::DriverAssignments, encode_rows(&assignments))
        .unwrap();

    let mut session = session_with(store);
    let scored = scoring_service::score_event(&mut session, "ABU").unwrap();

    assert_eq!(scored.rows[0].total, 16.0);
    assert_eq!(scored.rows[0].contributions[0].raw, 8.0);
}

#[test]
fn season_final_doubles_contributions() {
    let mut regular_session = session_with(league(&calendar()));
    let regular = scoring_service::score_event(&mut regular_session, "CHN").unwrap();
    assert_eq!(regular.multiplier, 1.0);

    let rules = LeagueRules {
        season_final_race_id: "CHN".into(),
        ..LeagueRules::default()
    };
    let mut session = ScoringSession::new(Box::new(league(&calendar())), rules);
    let final_score = scoring_service::score_event(&mut session, "CHN").unwrap();

    assert_eq!(final_score.multiplier, 2.0);
    assert_eq!(final_score.rows[0].total, 2.0 * regular.rows[0].total);
    assert_eq!(final_score.rows[0].total, 30.0);
}

#[test]
fn scoring_invalidates_the_cached_view() {
    let mut session = session_with(league(&calendar()));
    let before = session.get_view(false).unwrap();
    assert_eq!(before.player_points("AUS", "P1").unwrap().cumulative, 0.0);
    assert!(session.is_view_valid());

    scoring_service::score_event(&mut session, "AUS").unwrap();

    assert!(!session.is_view_valid());
    let view = session.get_view(false).unwrap();
    let points = view.player_points("AUS", "P1").unwrap();
    assert_eq!(points.cumulative, 10.0);
    assert_eq!(standings_service::standings(view)[0].points, 10.0);
}

#[test]
fn external_table_writes_invalidate_the_cached_view() {
    let mut session = session_with(league(&calendar()));
    assert_eq!(session.get_view(false).unwrap().driver_total("VER"), 25.0);

    let corrected = [
        result("AUS", "VER", 10.0),
        result("CHN", "VER", 25.0),
        result("ABU", "VER", 33.0),
    ];
    league_service::write_table(&mut session, TableName::RaceResults, encode_rows(&corrected))
        .unwrap();

    assert!(!session.is_view_valid());
    let view = session.get_view(false).unwrap();
    assert_eq!(view.driver_total("VER"), 33.0);
    assert_eq!(view.driver_points("ABU", "VER").unwrap().delta, 8.0);
}

#[test]
fn normalizing_twice_yields_identical_output() {
    let store = league(&calendar());
    let snapshot = loader::load_raw(&store).unwrap();

    let first = serde_json::to_vec(&normalizer::normalize(snapshot.clone())).unwrap();
    let second = serde_json::to_vec(&normalizer::normalize(snapshot)).unwrap();

    assert_eq!(first, second);
}

#[test]
fn substitution_at_the_final_scores_the_substitute_twice() {
    let mut session = session_with(league(&calendar()));
    assert_eq!(score_all(&mut session), [10.0, 15.0, 0.0]);

    league_service::record_substitution(&mut session, "ABU", "BEA", "RBR", "VER").unwrap();
    let rescored = scoring_service::score_event(&mut session, "ABU").unwrap();

    let row = &rescored.rows[0];
    assert_eq!(row.total, 16.0);
    assert_eq!(row.details, "VER (subbed by BEA): 8 ×2 = 16");
    let view = session.get_view(false).unwrap();
    assert_eq!(view.player_total("P1"), 41.0);
}

#[test]
fn locked_store_reports_a_recoverable_error() {
    let mut store = league(&calendar());
    store.set_locked(true);
    let mut session = session_with(store);

    let err = scoring_service::score_event(&mut session, "AUS").unwrap_err();

    assert!(err.is_recoverable());
}
