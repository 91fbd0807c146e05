use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use time::Date;

use crate::dao::models::{
    Driver, DriverAssignment, DriverId, PlayerId, PlayerPick, PlayerResult, Race, RaceId,
    RaceResult, Team, TeamId,
};

/// Typed copy of the seven league tables, as read from the store.
///
/// Reference tables are keyed by id in their stored order; the rest keep the
/// stored row order, which matters for first-match lookups.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    /// Calendar by race id.
    pub races: IndexMap<RaceId, Race>,
    /// Drivers by id.
    pub drivers: IndexMap<DriverId, Driver>,
    /// Teams by id.
    pub teams: IndexMap<TeamId, Team>,
    /// Every pick, in stored order.
    pub picks: Vec<PlayerPick>,
    /// Every substitution, in stored order.
    pub assignments: Vec<DriverAssignment>,
    /// Stored driver totals.
    pub race_results: Vec<RaceResult>,
    /// Stored player totals.
    pub player_results: Vec<PlayerResult>,
}

impl Snapshot {
    /// Race by id.
    pub fn race(&self, id: &str) -> Option<&Race> {
        self.races.get(id)
    }

    /// Driver by id.
    pub fn driver(&self, id: &str) -> Option<&Driver> {
        self.drivers.get(id)
    }

    /// Team by id.
    pub fn team(&self, id: &str) -> Option<&Team> {
        self.teams.get(id)
    }

    /// Every player id, first seen in stored results, then pick-only players.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        let ids: IndexSet<&PlayerId> = self
            .player_results
            .iter()
            .map(|result| &result.player_id)
            .chain(self.picks.iter().map(|pick| &pick.player_id))
            .collect();
        ids.into_iter().cloned().collect()
    }

    /// Display name of a player, taken from their first pick.
    pub fn player_name(&self, player_id: &str) -> Option<&str> {
        self.picks
            .iter()
            .find(|pick| pick.player_id.as_str() == player_id)
            .map(|pick| pick.player_name.as_str())
    }

    /// Whether the player has a pick or a stored result.
    pub fn has_player(&self, player_id: &str) -> bool {
        self.picks.iter().any(|pick| pick.player_id.as_str() == player_id)
            || self
                .player_results
                .iter()
                .any(|result| result.player_id.as_str() == player_id)
    }

    /// Picks of `player_id` whose interval covers `date`, in stored order.
    pub fn active_picks<'a>(
        &'a self,
        player_id: &'a str,
        date: Date,
    ) -> impl Iterator<Item = &'a PlayerPick> + 'a {
        self.picks
            .iter()
            .filter(move |pick| pick.player_id.as_str() == player_id && pick.is_active_on(date))
    }

    /// Substitutions recorded at `race_id` for `original`, in stored order.
    pub fn substitutions_for<'a>(
        &'a self,
        race_id: &'a str,
        original: &'a str,
    ) -> impl Iterator<Item = &'a DriverAssignment> + 'a {
        self.assignments.iter().filter(move |assignment| {
            assignment.race_id.as_str() == race_id
                && assignment.substituted_for.as_str() == original
        })
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn pick(player: &str, driver: &str) -> PlayerPick {
        PlayerPick {
            player_id: player.into(),
            player_name: format!("{player} name"),
            driver_id: driver.into(),
            from_date: Some(date!(2025 - 01 - 01)),
            to_date: None,
        }
    }

    #[test]
    fn players_are_listed_results_first_then_picks() {
        let snapshot = Snapshot {
            picks: vec![pick("P1", "VER"), pick("P3", "NOR"), pick("P1", "HAM")],
            player_results: vec![PlayerResult {
                race_id: "AUS".into(),
                player_id: "P2".into(),
                points: 4.0,
                calculation_details: String::new(),
            }],
            ..Snapshot::default()
        };

        let ids: Vec<_> = snapshot.player_ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, ["P2", "P1", "P3"]);
        assert_eq!(snapshot.player_name("P3"), Some("P3 name"));
        assert!(snapshot.has_player("P2"));
        assert!(!snapshot.has_player("P9"));
        assert_eq!(snapshot.active_picks("P1", date!(2025 - 05 - 01)).count(), 2);
    }
}
