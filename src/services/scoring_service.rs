use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::LeagueRules,
    dao::{
        models::{DriverId, PlayerId, PlayerResult, Race, RaceId, encode_rows},
        table::{TableData, TableName},
    },
    error::ServiceError,
    services::details::{format_segment, join_segments},
    state::{NormalizedView, ScoringSession},
};

/// Points one pick brought to a player at one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    /// Driver held by the player.
    pub driver_id: DriverId,
    /// Driver who raced in their place, if any.
    pub substitute: Option<DriverId>,
    /// Delta of the scoring driver at the event.
    pub raw: f64,
    /// Factor applied to `raw`.
    pub multiplier: f64,
    /// Credited points.
    pub points: f64,
}

/// Score of one player at the scored event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerScore {
    /// Scored player.
    pub player_id: PlayerId,
    /// Player display name.
    pub player_name: String,
    /// Points earned at this event.
    pub total: f64,
    /// Season-to-date total persisted for this event.
    pub cumulative: f64,
    /// One entry per active pick.
    pub contributions: Vec<Contribution>,
    /// Calculation details written to the store.
    pub details: String,
}

/// Outcome of scoring one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    /// Scored race.
    pub race_id: RaceId,
    /// Factor applied at this race.
    pub multiplier: f64,
    /// One row per known player.
    pub rows: Vec<PlayerScore>,
}

/// Score every player at `race_id` and persist the results.
///
/// Runs against a freshly loaded view. Previously stored rows for the race are
/// replaced, and later events are shifted so their per-event points are kept.
pub fn score_event(session: &mut ScoringSession, race_id: &str) -> Result<ScoreResult, ServiceError> {
    let rules = session.rules().clone();
    let (result, table) = {
        let view = session.get_view(true)?;
        let Some(race) = view.snapshot.race(race_id) else {
            return Err(ServiceError::UnknownEvent(race_id.to_string()));
        };
        let result = compute_scores(view, race, &rules);
        let table = player_results_table(view, race, &result);
        (result, table)
    };

    session.write_table(TableName::PlayerResults, table)?;
    info!(
        race_id = %result.race_id,
        players = result.rows.len(),
        multiplier = result.multiplier,
        "player points calculated"
    );
    Ok(result)
}

/// Compute every player's score at `race` without persisting anything.
pub fn compute_scores(view: &NormalizedView, race: &Race, rules: &LeagueRules) -> ScoreResult {
    let multiplier = rules.multiplier_for(race.id.as_str());
    let prior = prior_event(view, race);

    let rows = view
        .player_names
        .iter()
        .map(|(player_id, player_name)| {
            let contributions: Vec<Contribution> = view
                .snapshot
                .active_picks(player_id.as_str(), race.date)
                .map(|pick| {
                    let substitute = substitute_for(view, race, &pick.driver_id);
                    let scoring = substitute.as_ref().unwrap_or(&pick.driver_id);
                    let raw = driver_delta(view, race, prior, scoring);
                    Contribution {
                        driver_id: pick.driver_id.clone(),
                        substitute,
                        raw,
                        multiplier,
                        points: raw * multiplier,
                    }
                })
                .collect();

            let total = contributions.iter().map(|c| c.points).sum::<f64>();
            let previous = prior
                .and_then(|event| view.player_points(event.as_str(), player_id.as_str()))
                .map(|points| points.cumulative)
                .unwrap_or(0.0);
            let details = join_segments(contributions.iter().map(|c| {
                format_segment(
                    c.driver_id.as_str(),
                    c.substitute.as_ref().map(DriverId::as_str),
                    c.raw,
                    c.multiplier,
                )
            }));

            PlayerScore {
                player_id: player_id.clone(),
                player_name: player_name.clone(),
                total,
                cumulative: previous + total,
                contributions,
                details,
            }
        })
        .collect();

    ScoreResult {
        race_id: race.id.clone(),
        multiplier,
        rows,
    }
}

/// First substitution recorded for `original` at `race`.
fn substitute_for(view: &NormalizedView, race: &Race, original: &DriverId) -> Option<DriverId> {
    let mut matches = view
        .snapshot
        .substitutions_for(race.id.as_str(), original.as_str());
    let first = matches.next()?;
    if matches.next().is_some() {
        warn!(
            race_id = %race.id,
            driver_id = %original,
            substitute = %first.driver_id,
            "several substitutions recorded for driver; using the first"
        );
    }
    Some(first.driver_id.clone())
}

/// Event folded immediately before `race`.
///
/// For a race not yet in the event sequence, the last event on or before its date.
fn prior_event<'a>(view: &'a NormalizedView, race: &Race) -> Option<&'a RaceId> {
    match view.event_position(race.id.as_str()) {
        Some(position) => position.checked_sub(1).and_then(|p| view.events.get(p)),
        None => view
            .event_races()
            .filter(|event| event.date <= race.date)
            .last()
            .map(|event| &event.id),
    }
}

/// Delta of `driver_id` at `race`, zero when the driver has no result there.
fn driver_delta(
    view: &NormalizedView,
    race: &Race,
    prior: Option<&RaceId>,
    driver_id: &DriverId,
) -> f64 {
    if let Some(points) = view.driver_points(race.id.as_str(), driver_id.as_str()) {
        return points.delta;
    }

    let recorded = view
        .snapshot
        .race_results
        .iter()
        .rev()
        .find(|result| result.race_id == race.id && &result.driver_id == driver_id)
        .map(|result| result.points);
    let Some(cumulative) = recorded else {
        return 0.0;
    };
    let previous = prior
        .and_then(|event| view.driver_points(event.as_str(), driver_id.as_str()))
        .map(|points| points.cumulative)
        .unwrap_or(0.0);
    cumulative - previous
}

/// Rebuild the PlayerResults table with the race's rows replaced.
///
/// The change in each player's cumulative total is carried into their rows for
/// later events.
fn player_results_table(view: &NormalizedView, race: &Race, result: &ScoreResult) -> TableData {
    let stored = &view.snapshot.player_results;
    let later: Vec<&RaceId> = match view.event_position(race.id.as_str()) {
        Some(position) => view.events.iter().skip(position + 1).collect(),
        None => view
            .event_races()
            .filter(|event| event.date > race.date)
            .map(|event| &event.id)
            .collect(),
    };

    let mut rows: Vec<PlayerResult> = stored
        .iter()
        .filter(|row| row.race_id != race.id)
        .cloned()
        .collect();

    for score in &result.rows {
        let previous = stored
            .iter()
            .rev()
            .find(|row| row.race_id == race.id && row.player_id == score.player_id)
            .map(|row| row.points)
            .unwrap_or(score.cumulative - score.total);
        let shift = score.cumulative - previous;
        if shift != 0.0 {
            for row in rows
                .iter_mut()
                .filter(|row| row.player_id == score.player_id && later.contains(&&row.race_id))
            {
                row.points += shift;
            }
        }

        rows.push(PlayerResult {
            race_id: race.id.clone(),
            player_id: score.player_id.clone(),
            points: score.cumulative,
            calculation_details: score.details.clone(),
        });
    }

    encode_rows(&rows)
}
