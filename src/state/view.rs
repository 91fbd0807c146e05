use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    dao::models::{DriverId, PlayerId, Race, RaceId},
    state::snapshot::Snapshot,
};

/// Points of one entity at one event.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Points {
    /// Earned at this event alone.
    pub delta: f64,
    /// Season-to-date total after this event.
    pub cumulative: f64,
}

/// Points of one player at one event, with the regenerated breakdown.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PlayerPoints {
    /// Earned at this event alone.
    pub delta: f64,
    /// Season-to-date total after this event.
    pub cumulative: f64,
    /// Regenerated calculation details.
    pub details: String,
}

/// Delta-based view of the league, one row per entity per completed event.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizedView {
    /// Typed tables the view was built from.
    pub snapshot: Snapshot,
    /// Completed races in ascending date order.
    pub events: Vec<RaceId>,
    /// Driver points per event.
    pub drivers: IndexMap<RaceId, IndexMap<DriverId, Points>>,
    /// Player points per event.
    pub players: IndexMap<RaceId, IndexMap<PlayerId, PlayerPoints>>,
    /// Player display names, in the order players were first seen.
    pub player_names: IndexMap<PlayerId, String>,
}

impl NormalizedView {
    /// Position of `race_id` in the event sequence.
    pub fn event_position(&self, race_id: &str) -> Option<usize> {
        self.events.iter().position(|event| event.as_str() == race_id)
    }

    /// Completed races in event order.
    pub fn event_races(&self) -> impl Iterator<Item = &Race> + '_ {
        self.events
            .iter()
            .filter_map(|event| self.snapshot.race(event.as_str()))
    }

    /// Points of a driver at an event.
    pub fn driver_points(&self, race_id: &str, driver_id: &str) -> Option<Points> {
        self.drivers.get(race_id)?.get(driver_id).copied()
    }

    /// Points of a player at an event.
    pub fn player_points(&self, race_id: &str, player_id: &str) -> Option<&PlayerPoints> {
        self.players.get(race_id)?.get(player_id)
    }

    /// Season total of a player: cumulative after the last event.
    pub fn player_total(&self, player_id: &str) -> f64 {
        self.events
            .last()
            .and_then(|event| self.player_points(event.as_str(), player_id))
            .map(|points| points.cumulative)
            .unwrap_or(0.0)
    }

    /// Season total of a driver: cumulative after the last event.
    pub fn driver_total(&self, driver_id: &str) -> f64 {
        self.events
            .last()
            .and_then(|event| self.driver_points(event.as_str(), driver_id))
            .map(|points| points.cumulative)
            .unwrap_or(0.0)
    }

    /// Display name of a player, falling back to the id.
    pub fn player_name<'a>(&'a self, player_id: &'a str) -> &'a str {
        self.player_names
            .get(player_id)
            .map(String::as_str)
            .unwrap_or(player_id)
    }
}
