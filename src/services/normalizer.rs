//! Convert stored season-to-date figures into per-event deltas.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use tracing::info;

use crate::{
    dao::models::{DriverId, PlayerId, Race, RaceId},
    services::details::{format_segment, join_segments, parse_details},
    state::{
        NormalizedView, Snapshot,
        view::{PlayerPoints, Points},
    },
};

/// Completed races in ascending date order; races sharing a date keep their stored order.
pub fn event_sequence<'a>(races: impl IntoIterator<Item = &'a Race>) -> Vec<RaceId> {
    let mut completed: Vec<&Race> = races.into_iter().filter(|race| race.is_completed()).collect();
    completed.sort_by_key(|race| race.date);
    completed.into_iter().map(|race| race.id.clone()).collect()
}

/// Walk `events` in the given order, differencing each recorded cumulative
/// value against the previous one. Events without a record yield a zero delta
/// and leave the running total untouched.
pub fn fold_deltas<'a, F>(events: impl IntoIterator<Item = &'a RaceId>, recorded: F) -> Vec<Points>
where
    F: Fn(&RaceId) -> Option<f64>,
{
    let mut previous = 0.0;
    events
        .into_iter()
        .map(|event| match recorded(event) {
            Some(cumulative) => {
                let delta = cumulative - previous;
                previous = cumulative;
                Points { delta, cumulative }
            }
            None => Points {
                delta: 0.0,
                cumulative: previous,
            },
        })
        .collect()
}

/// Produce the delta-based view of `snapshot`.
pub fn normalize(snapshot: Snapshot) -> NormalizedView {
    let events = event_sequence(snapshot.races.values());

    // Later rows for the same (race, entity) win.
    let driver_records: HashMap<(&str, &str), f64> = snapshot
        .race_results
        .iter()
        .map(|result| ((result.race_id.as_str(), result.driver_id.as_str()), result.points))
        .collect();
    let player_records: HashMap<(&str, &str), (f64, &str)> = snapshot
        .player_results
        .iter()
        .map(|result| {
            (
                (result.race_id.as_str(), result.player_id.as_str()),
                (result.points, result.calculation_details.as_str()),
            )
        })
        .collect();

    let driver_ids: IndexSet<DriverId> = snapshot
        .drivers
        .keys()
        .cloned()
        .chain(snapshot.race_results.iter().map(|result| result.driver_id.clone()))
        .collect();

    let mut drivers: IndexMap<RaceId, IndexMap<DriverId, Points>> = events
        .iter()
        .map(|event| (event.clone(), IndexMap::with_capacity(driver_ids.len())))
        .collect();
    for driver_id in &driver_ids {
        let series = fold_deltas(&events, |event| {
            driver_records
                .get(&(event.as_str(), driver_id.as_str()))
                .copied()
        });
        for (event, points) in events.iter().zip(series) {
            if let Some(row) = drivers.get_mut(event) {
                row.insert(driver_id.clone(), points);
            }
        }
    }

    let player_ids = snapshot.player_ids();
    let mut players: IndexMap<RaceId, IndexMap<PlayerId, PlayerPoints>> = events
        .iter()
        .map(|event| (event.clone(), IndexMap::with_capacity(player_ids.len())))
        .collect();
    for player_id in &player_ids {
        let series = fold_deltas(&events, |event| {
            player_records
                .get(&(event.as_str(), player_id.as_str()))
                .map(|(points, _)| *points)
        });
        for (event, points) in events.iter().zip(series) {
            let details = player_records
                .get(&(event.as_str(), player_id.as_str()))
                .map(|(_, details)| regenerate_details(details, drivers.get(event)))
                .unwrap_or_default();
            if let Some(row) = players.get_mut(event) {
                row.insert(
                    player_id.clone(),
                    PlayerPoints {
                        delta: points.delta,
                        cumulative: points.cumulative,
                        details,
                    },
                );
            }
        }
    }

    let player_names = player_ids
        .iter()
        .map(|id| {
            let name = snapshot
                .player_name(id.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| id.to_string());
            (id.clone(), name)
        })
        .collect();

    info!(
        events = events.len(),
        drivers = driver_ids.len(),
        players = player_ids.len(),
        "league view normalized"
    );

    NormalizedView {
        snapshot,
        events,
        drivers,
        players,
        player_names,
    }
}

/// Rewrite a stored breakdown with the event's driver deltas.
///
/// Segments whose scoring driver has no row at this event are dropped.
fn regenerate_details(original: &str, event_drivers: Option<&IndexMap<DriverId, Points>>) -> String {
    let Some(event_drivers) = event_drivers else {
        return String::new();
    };
    join_segments(parse_details(original).into_iter().filter_map(|segment| {
        let points = event_drivers.get(segment.scoring_driver())?;
        Some(format_segment(
            segment.driver.as_str(),
            segment.substitute.as_ref().map(DriverId::as_str),
            points.delta,
            segment.multiplier.unwrap_or(1.0),
        ))
    }))
}

#[cfg(test)]
mod tests {
    use time::{Date, macros::date};

    use super::*;
    use crate::dao::models::{Driver, PlayerResult, RaceResult, RaceStatus};

    fn race(id: &str, date: Date, status: RaceStatus) -> Race {
        Race {
            id: id.into(),
            name: format!("{id} Grand Prix"),
            date,
            status,
        }
    }

    fn driver_result(race: &str, driver: &str, points: f64) -> RaceResult {
        RaceResult {
            race_id: race.into(),
            driver_id: driver.into(),
            points,
        }
    }

    fn snapshot() -> Snapshot {
        let races = [
            race("E1", date!(2025 - 03 - 16), RaceStatus::Completed),
            race("E2", date!(2025 - 03 - 23), RaceStatus::Completed),
            race("E3", date!(2025 - 04 - 06), RaceStatus::Upcoming),
        ];
        Snapshot {
            races: races.into_iter().map(|r| (r.id.clone(), r)).collect(),
            drivers: [Driver {
                id: "VER".into(),
                name: "Max Verstappen".into(),
                default_team: Some("RBR".into()),
                credits: 3,
            }]
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect(),
            race_results: vec![
                driver_result("E1", "VER", 10.0),
                driver_result("E2", "VER", 25.0),
                driver_result("E1", "NOR", 4.0),
                driver_result("E3", "VER", 99.0),
            ],
            player_results: vec![
                PlayerResult {
                    race_id: "E1".into(),
                    player_id: "P1".into(),
                    points: 10.0,
                    calculation_details: "VER: 10, XXX: 3".into(),
                },
                PlayerResult {
                    race_id: "E2".into(),
                    player_id: "P1".into(),
                    points: 25.0,
                    calculation_details: "VER: 25".into(),
                },
            ],
            ..Snapshot::default()
        }
    }

    #[test]
    fn only_completed_races_form_the_event_sequence() {
        let view = normalize(snapshot());
        assert_eq!(view.events, [RaceId::from("E1"), RaceId::from("E2")]);
    }

    #[test]
    fn cumulative_values_become_deltas() {
        let view = normalize(snapshot());
        assert_eq!(
            view.driver_points("E2", "VER"),
            Some(Points {
                delta: 15.0,
                cumulative: 25.0
            })
        );
        // Drivers only seen in results still get rows; missing records read as zero.
        assert_eq!(
            view.driver_points("E2", "NOR"),
            Some(Points {
                delta: 0.0,
                cumulative: 4.0
            })
        );
        assert_eq!(view.driver_total("NOR"), 4.0);
    }

    #[test]
    fn details_are_regenerated_from_deltas() {
        let view = normalize(snapshot());
        let e1 = view.player_points("E1", "P1").unwrap();
        assert_eq!(e1.details, "VER: 10");
        let e2 = view.player_points("E2", "P1").unwrap();
        assert_eq!(e2.delta, 15.0);
        assert_eq!(e2.details, "VER: 15");
    }

    #[test]
    fn decreasing_cumulative_yields_negative_delta() {
        let ids = [RaceId::from("A"), RaceId::from("B")];
        let series = fold_deltas(&ids, |event| match event.as_str() {
            "A" => Some(10.0),
            _ => Some(7.0),
        });
        assert_eq!(series[1].delta, -3.0);
        assert_eq!(series[1].cumulative, 7.0);
    }

    #[test]
    fn empty_event_sequence_normalizes_to_empty_tables() {
        let mut snapshot = snapshot();
        for race in snapshot.races.values_mut() {
            race.status = RaceStatus::Upcoming;
        }
        let view = normalize(snapshot);
        assert!(view.events.is_empty());
        assert!(view.drivers.is_empty());
        assert!(view.players.is_empty());
        assert_eq!(view.player_total("P1"), 0.0);
    }
}
