//! Read-side queries over the normalized view.

use indexmap::IndexMap;
use serde::Serialize;
use time::Date;

use crate::{
    dao::models::{DriverId, PlayerId, Race, RaceId, TeamId},
    error::ServiceError,
    services::details::{Segment, parse_details},
    state::NormalizedView,
};

const TIE_TOLERANCE: f64 = 1e-9;

/// One line of a ranking table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    /// Competition rank: tied entries share a rank and the next rank is skipped.
    pub rank: usize,
    /// Player or driver id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Season total.
    pub points: f64,
}

/// Running season total of one player along the event sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSeries {
    /// Player id.
    pub player_id: PlayerId,
    /// Player display name.
    pub player_name: String,
    /// Cumulative total after each event.
    pub points: Vec<(RaceId, f64)>,
}

/// Points of one player at one event.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownRow {
    /// Player id.
    pub player_id: PlayerId,
    /// Player display name.
    pub player_name: String,
    /// Points earned at the event.
    pub points: f64,
    /// Regenerated calculation details.
    pub details: String,
    /// Parsed details.
    pub contributions: Vec<Segment>,
}

/// Points a constructor team collected at each event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamPerformance {
    /// Team code.
    pub team_id: TeamId,
    /// Display name.
    pub team_name: String,
    /// One entry per event, in event order.
    pub race_points: Vec<(RaceId, f64)>,
    /// Season total.
    pub total: f64,
}

/// Points scored per credit spent on a driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditEfficiency {
    /// Driver code.
    pub driver_id: DriverId,
    /// Display name.
    pub name: String,
    /// Cost in team credits.
    pub credits: u32,
    /// Events considered.
    pub races: usize,
    /// Points over the considered events.
    pub total_points: f64,
    /// Points per considered event.
    pub avg_points: f64,
    /// Average points divided by credits.
    pub efficiency: f64,
}

/// How much each of a player's drivers contributed over the season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerDriverPoints {
    /// Player id.
    pub player_id: PlayerId,
    /// Player display name.
    pub player_name: String,
    /// Keyed by the picked driver; substitutes count for the driver they replaced.
    pub drivers: IndexMap<DriverId, f64>,
    /// Sum over all drivers.
    pub total: f64,
}

/// Players ranked by season total.
pub fn standings(view: &NormalizedView) -> Vec<Standing> {
    rank(view.player_names.iter().map(|(id, name)| {
        (id.to_string(), name.clone(), view.player_total(id.as_str()))
    }))
}

/// Drivers ranked by season total.
pub fn driver_standings(view: &NormalizedView) -> Vec<Standing> {
    let driver_ids = view
        .events
        .last()
        .and_then(|event| view.drivers.get(event))
        .map(|row| row.keys().cloned().collect::<Vec<_>>())
        .unwrap_or_else(|| view.snapshot.drivers.keys().cloned().collect());

    rank(driver_ids.into_iter().map(|id| {
        let name = view
            .snapshot
            .driver(id.as_str())
            .map(|driver| driver.name.clone())
            .unwrap_or_else(|| id.to_string());
        let points = view.driver_total(id.as_str());
        (id.to_string(), name, points)
    }))
}

fn rank(entries: impl Iterator<Item = (String, String, f64)>) -> Vec<Standing> {
    let mut entries: Vec<_> = entries.collect();
    entries.sort_by(|a, b| b.2.total_cmp(&a.2));

    let mut standings: Vec<Standing> = Vec::with_capacity(entries.len());
    for (position, (id, name, points)) in entries.into_iter().enumerate() {
        let rank = match standings.last() {
            Some(previous) if (previous.points - points).abs() < TIE_TOLERANCE => previous.rank,
            _ => position + 1,
        };
        standings.push(Standing {
            rank,
            id,
            name,
            points,
        });
    }
    standings
}

/// Cumulative totals of every player after each event.
pub fn season_progress(view: &NormalizedView) -> Vec<ProgressSeries> {
    view.player_names
        .iter()
        .map(|(player_id, player_name)| ProgressSeries {
            player_id: player_id.clone(),
            player_name: player_name.clone(),
            points: view
                .events
                .iter()
                .map(|event| {
                    let cumulative = view
                        .player_points(event.as_str(), player_id.as_str())
                        .map(|points| points.cumulative)
                        .unwrap_or(0.0);
                    (event.clone(), cumulative)
                })
                .collect(),
        })
        .collect()
}

/// Per-player points at one event, highest first.
///
/// A known race that has not been completed yet has no rows.
pub fn race_breakdown(view: &NormalizedView, race_id: &str) -> Result<Vec<BreakdownRow>, ServiceError> {
    if view.snapshot.race(race_id).is_none() {
        return Err(ServiceError::UnknownEvent(race_id.to_string()));
    }
    let Some(players) = view.players.get(race_id) else {
        return Ok(Vec::new());
    };

    let mut rows: Vec<BreakdownRow> = players
        .iter()
        .map(|(player_id, points)| BreakdownRow {
            player_id: player_id.clone(),
            player_name: view.player_name(player_id.as_str()).to_string(),
            points: points.delta,
            details: points.details.clone(),
            contributions: parse_details(&points.details),
        })
        .collect();
    rows.sort_by(|a, b| b.points.total_cmp(&a.points));
    Ok(rows)
}

/// Team points per event, best season total first.
///
/// A driver's delta goes to the team a substitution says they raced for at
/// that event, otherwise to their default team.
pub fn team_performance(view: &NormalizedView) -> Vec<TeamPerformance> {
    let mut teams: IndexMap<TeamId, TeamPerformance> = view
        .snapshot
        .teams
        .values()
        .map(|team| {
            let performance = TeamPerformance {
                team_id: team.id.clone(),
                team_name: team.name.clone(),
                race_points: view.events.iter().map(|event| (event.clone(), 0.0)).collect(),
                total: 0.0,
            };
            (team.id.clone(), performance)
        })
        .collect();

    for (position, event) in view.events.iter().enumerate() {
        let Some(drivers) = view.drivers.get(event) else {
            continue;
        };
        for (driver_id, points) in drivers {
            let Some(team) = fielding_team(view, event, driver_id)
                .and_then(|team_id| teams.get_mut(team_id))
            else {
                continue;
            };
            team.race_points[position].1 += points.delta;
            team.total += points.delta;
        }
    }

    let mut teams: Vec<TeamPerformance> = teams.into_values().collect();
    teams.sort_by(|a, b| b.total.total_cmp(&a.total));
    teams
}

fn fielding_team<'a>(
    view: &'a NormalizedView,
    race_id: &RaceId,
    driver_id: &DriverId,
) -> Option<&'a TeamId> {
    view.snapshot
        .assignments
        .iter()
        .find(|assignment| &assignment.race_id == race_id && &assignment.driver_id == driver_id)
        .and_then(|assignment| assignment.team_id.as_ref())
        .or_else(|| {
            view.snapshot
                .driver(driver_id.as_str())
                .and_then(|driver| driver.default_team.as_ref())
        })
}

/// Points per credit of every non-reserve driver, most efficient first.
///
/// Covers the whole season, or a single event when `race_id` is given. A known
/// race that has not been completed yet has no rows.
pub fn credit_efficiency(
    view: &NormalizedView,
    race_id: Option<&str>,
) -> Result<Vec<CreditEfficiency>, ServiceError> {
    let events: Vec<&RaceId> = match race_id {
        Some(race_id) => {
            if view.snapshot.race(race_id).is_none() {
                return Err(ServiceError::UnknownEvent(race_id.to_string()));
            }
            view.events.iter().filter(|event| event.as_str() == race_id).collect()
        }
        None => view.events.iter().collect(),
    };
    if events.is_empty() {
        return Ok(Vec::new());
    }

    let mut rows: Vec<CreditEfficiency> = view
        .snapshot
        .drivers
        .values()
        .filter(|driver| !driver.is_reserve())
        .map(|driver| {
            let total_points: f64 = events
                .iter()
                .filter_map(|event| view.driver_points(event.as_str(), driver.id.as_str()))
                .map(|points| points.delta)
                .sum();
            let avg_points = total_points / events.len() as f64;
            CreditEfficiency {
                driver_id: driver.id.clone(),
                name: driver.name.clone(),
                credits: driver.credits,
                races: events.len(),
                total_points,
                avg_points,
                efficiency: avg_points / f64::from(driver.credits),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.efficiency.total_cmp(&a.efficiency));
    Ok(rows)
}

/// Per player, the season points credited to each picked driver.
///
/// Read from the calculation details of every event.
pub fn player_driver_points(view: &NormalizedView) -> Vec<PlayerDriverPoints> {
    view.player_names
        .iter()
        .map(|(player_id, player_name)| {
            let mut drivers: IndexMap<DriverId, f64> = IndexMap::new();
            for event in &view.events {
                let Some(points) = view.player_points(event.as_str(), player_id.as_str()) else {
                    continue;
                };
                for segment in parse_details(&points.details) {
                    *drivers.entry(segment.driver).or_default() += segment.points.unwrap_or(0.0);
                }
            }
            PlayerDriverPoints {
                player_id: player_id.clone(),
                player_name: player_name.clone(),
                total: drivers.values().sum(),
                drivers,
            }
        })
        .collect()
}

/// Races dated after `today`, soonest first.
pub fn upcoming_races(view: &NormalizedView, today: Date) -> Vec<&Race> {
    let mut races: Vec<&Race> = view
        .snapshot
        .races
        .values()
        .filter(|race| race.date > today)
        .collect();
    races.sort_by_key(|race| race.date);
    races
}

/// Latest race dated on or before `today`.
pub fn most_recent_race(view: &NormalizedView, today: Date) -> Option<&Race> {
    view.snapshot
        .races
        .values()
        .filter(|race| race.date <= today)
        .max_by_key(|race| race.date)
}

/// Open-ended picks grouped by player, in pick order.
pub fn current_picks(view: &NormalizedView) -> IndexMap<PlayerId, Vec<DriverId>> {
    let mut picks: IndexMap<PlayerId, Vec<DriverId>> = IndexMap::new();
    for pick in view.snapshot.picks.iter().filter(|pick| pick.is_open()) {
        picks
            .entry(pick.player_id.clone())
            .or_default()
            .push(pick.driver_id.clone());
    }
    picks
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::{
        dao::models::{
            Driver, DriverAssignment, PlayerPick, PlayerResult, RaceResult, RaceStatus, Team,
        },
        services::normalizer::normalize,
        state::Snapshot,
    };

    fn view() -> NormalizedView {
        let races = [
            ("AUS", date!(2025 - 03 - 16), RaceStatus::Completed),
            ("CHN", date!(2025 - 03 - 23), RaceStatus::Completed),
            ("JPN", date!(2025 - 04 - 06), RaceStatus::Upcoming),
        ]
        .map(|(id, date, status)| Race {
            id: id.into(),
            name: id.into(),
            date,
            status,
        });
        let player_result = |race: &str, player: &str, points: f64, details: &str| PlayerResult {
            race_id: race.into(),
            player_id: player.into(),
            points,
            calculation_details: details.into(),
        };
        let driver_result = |race: &str, driver: &str, points: f64| RaceResult {
            race_id: race.into(),
            driver_id: driver.into(),
            points,
        };
        let pick = |player: &str, driver: &str, open: bool| PlayerPick {
            player_id: player.into(),
            player_name: format!("Player {player}"),
            driver_id: driver.into(),
            from_date: None,
            to_date: (!open).then_some(date!(2025 - 03 - 20)),
        };

        normalize(Snapshot {
            races: races.into_iter().map(|r| (r.id.clone(), r)).collect(),
            picks: vec![
                pick("P1", "VER", true),
                pick("P2", "NOR", false),
                pick("P2", "LEC", true),
                pick("P3", "LEC", true),
            ],
            race_results: vec![
                driver_result("AUS", "VER", 18.0),
                driver_result("AUS", "NOR", 25.0),
                driver_result("CHN", "VER", 36.0),
                driver_result("CHN", "NOR", 25.0),
            ],
            player_results: vec![
                player_result("AUS", "P1", 18.0, "VER: 18"),
                player_result("AUS", "P2", 25.0, "NOR: 25"),
                player_result("CHN", "P1", 36.0, "VER: 36"),
                player_result("CHN", "P2", 36.0, "LEC: 11"),
            ],
            ..Snapshot::default()
        })
    }

    #[test]
    fn ties_share_a_competition_rank() {
        let standings = standings(&view());
        let ranks: Vec<_> = standings.iter().map(|s| (s.id.as_str(), s.rank)).collect();
        assert_eq!(ranks, [("P1", 1), ("P2", 1), ("P3", 3)]);
        assert_eq!(standings[1].name, "Player P2");
    }

    #[test]
    fn drivers_are_ranked_by_latest_cumulative() {
        let standings = driver_standings(&view());
        assert_eq!(standings[0].id, "VER");
        assert_eq!(standings[0].points, 36.0);
        assert_eq!(standings[1].id, "NOR");
    }

    #[test]
    fn progress_follows_the_event_sequence() {
        let progress = season_progress(&view());
        assert_eq!(
            progress[0].points,
            vec![(RaceId::from("AUS"), 18.0), (RaceId::from("CHN"), 36.0)]
        );
        assert_eq!(progress[2].points[1].1, 0.0);
    }

    #[test]
    fn breakdown_lists_highest_scorer_first() {
        let view = view();
        let rows = race_breakdown(&view, "CHN").unwrap();
        assert_eq!(rows[0].player_id.as_str(), "P1");
        assert_eq!(rows[0].points, 18.0);
        assert_eq!(rows[0].details, "VER: 18");
        assert_eq!(rows[0].contributions[0].points, Some(18.0));
        // LEC has no result at CHN, so the segment is dropped.
        assert_eq!(rows[1].details, "");

        assert!(race_breakdown(&view, "JPN").unwrap().is_empty());
        assert!(matches!(
            race_breakdown(&view, "XXX"),
            Err(ServiceError::UnknownEvent(_))
        ));
    }

    #[test]
    fn calendar_queries_split_on_today() {
        let view = view();
        let today = date!(2025 - 03 - 23);
        let upcoming: Vec<_> = upcoming_races(&view, today).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(upcoming, ["JPN"]);
        assert_eq!(most_recent_race(&view, today).map(|r| r.id.as_str()), Some("CHN"));
        assert!(most_recent_race(&view, date!(2025 - 01 - 01)).is_none());
    }

    /// Two completed races. BEA races for RBR in place of VER at CHN; HAD is a
    /// reserve without results.
    fn constructor_view() -> NormalizedView {
        let races = [
            ("AUS", date!(2025 - 03 - 16)),
            ("CHN", date!(2025 - 03 - 23)),
        ]
        .map(|(id, date)| Race {
            id: id.into(),
            name: id.into(),
            date,
            status: RaceStatus::Completed,
        });
        let drivers = [
            ("VER", "RBR", 4),
            ("TSU", "RBR", 2),
            ("HAD", "RBR", 0),
            ("BEA", "HAS", 1),
            ("OCO", "HAS", 1),
        ]
        .map(|(id, team, credits)| Driver {
            id: id.into(),
            name: id.into(),
            default_team: Some(team.into()),
            credits,
        });
        let teams = [("RBR", "Red Bull Racing"), ("HAS", "Haas")].map(|(id, name)| Team {
            id: id.into(),
            name: name.into(),
        });
        let result = |race: &str, driver: &str, points: f64| RaceResult {
            race_id: race.into(),
            driver_id: driver.into(),
            points,
        };

        normalize(Snapshot {
            races: races.into_iter().map(|r| (r.id.clone(), r)).collect(),
            drivers: drivers.into_iter().map(|d| (d.id.clone(), d)).collect(),
            teams: teams.into_iter().map(|t| (t.id.clone(), t)).collect(),
            assignments: vec![DriverAssignment {
                race_id: "CHN".into(),
                driver_id: "BEA".into(),
                team_id: Some("RBR".into()),
                substituted_for: "VER".into(),
            }],
            race_results: vec![
                result("AUS", "VER", 18.0),
                result("AUS", "TSU", 2.0),
                result("AUS", "BEA", 0.0),
                result("AUS", "OCO", 4.0),
                result("CHN", "VER", 18.0),
                result("CHN", "TSU", 2.0),
                result("CHN", "BEA", 10.0),
                result("CHN", "OCO", 4.0),
            ],
            player_results: vec![
                PlayerResult {
                    race_id: "AUS".into(),
                    player_id: "P1".into(),
                    points: 22.0,
                    calculation_details: "VER: 18, OCO: 4".into(),
                },
                PlayerResult {
                    race_id: "CHN".into(),
                    player_id: "P1".into(),
                    points: 32.0,
                    calculation_details: "VER (subbed by BEA): 10, OCO: 0".into(),
                },
            ],
            ..Snapshot::default()
        })
    }

    #[test]
    fn substitutes_score_for_the_team_they_raced_for() {
        let teams = team_performance(&constructor_view());

        assert_eq!(teams[0].team_id.as_str(), "RBR");
        assert_eq!(
            teams[0].race_points,
            vec![(RaceId::from("AUS"), 20.0), (RaceId::from("CHN"), 10.0)]
        );
        assert_eq!(teams[0].total, 30.0);
        assert_eq!(teams[1].team_name, "Haas");
        assert_eq!(teams[1].total, 4.0);
    }

    #[test]
    fn efficiency_ranks_points_per_credit() {
        let view = constructor_view();

        let season = credit_efficiency(&view, None).unwrap();
        let order: Vec<_> = season.iter().map(|row| row.driver_id.as_str()).collect();
        assert_eq!(order, ["BEA", "VER", "OCO", "TSU"]);
        assert_eq!(season[1].avg_points, 9.0);
        assert_eq!(season[1].efficiency, 2.25);
        assert_eq!(season[1].races, 2);

        let chn = credit_efficiency(&view, Some("CHN")).unwrap();
        assert_eq!(chn[0].driver_id.as_str(), "BEA");
        assert_eq!(chn[0].efficiency, 10.0);
        assert_eq!(chn[0].races, 1);

        assert!(matches!(
            credit_efficiency(&view, Some("XXX")),
            Err(ServiceError::UnknownEvent(_))
        ));
    }

    #[test]
    fn driver_contributions_add_up_per_player() {
        let rows = player_driver_points(&constructor_view());

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].drivers[&DriverId::from("VER")], 28.0);
        assert_eq!(rows[0].drivers[&DriverId::from("OCO")], 4.0);
        assert_eq!(rows[0].total, 32.0);
    }

    #[test]
    fn current_picks_only_include_open_picks() {
        let picks = current_picks(&view());
        assert_eq!(picks["P2"], vec![DriverId::from("LEC")]);
        assert_eq!(picks.len(), 3);
    }
}
