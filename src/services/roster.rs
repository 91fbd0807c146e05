//! Team composition rules: how many drivers a player holds and what they may cost.

use indexmap::IndexSet;
use serde::Serialize;

use crate::{
    config::LeagueRules,
    dao::models::{Driver, DriverId},
    error::{EntityKind, ServiceError},
    state::NormalizedView,
};

/// A team that satisfies the roster rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamOption {
    /// Drivers of the team.
    pub drivers: Vec<DriverId>,
    /// Credit total.
    pub credits: u32,
}

/// Check that `driver_ids` form a legal team, returning its credit total.
pub fn validate_team(
    view: &NormalizedView,
    driver_ids: &[DriverId],
    rules: &LeagueRules,
) -> Result<u32, ServiceError> {
    let distinct: IndexSet<&DriverId> = driver_ids.iter().collect();
    if distinct.len() != driver_ids.len() {
        return Err(ServiceError::InvalidInput(
            "a team cannot hold the same driver twice".into(),
        ));
    }
    if driver_ids.len() != rules.team_size {
        return Err(ServiceError::InvalidInput(format!(
            "a team holds exactly {} drivers, got {}",
            rules.team_size,
            driver_ids.len()
        )));
    }

    let mut credits = 0;
    for driver_id in driver_ids {
        let Some(driver) = view.snapshot.driver(driver_id.as_str()) else {
            return Err(ServiceError::unknown(EntityKind::Driver, driver_id));
        };
        credits += driver.credits;
    }
    if credits > rules.max_credits {
        return Err(ServiceError::InvalidInput(format!(
            "team costs {credits} credits, the limit is {}",
            rules.max_credits
        )));
    }
    Ok(credits)
}

/// Every legal team of non-reserve drivers, most expensive first.
pub fn available_teams(view: &NormalizedView, rules: &LeagueRules) -> Vec<TeamOption> {
    let pool: Vec<&Driver> = view
        .snapshot
        .drivers
        .values()
        .filter(|driver| !driver.is_reserve())
        .collect();

    let mut teams = Vec::new();
    let mut chosen = Vec::with_capacity(rules.team_size);
    collect_teams(&pool, 0, rules, &mut chosen, &mut teams);
    teams.sort_by(|a, b| b.credits.cmp(&a.credits));
    teams
}

fn collect_teams<'a>(
    pool: &[&'a Driver],
    start: usize,
    rules: &LeagueRules,
    chosen: &mut Vec<&'a Driver>,
    teams: &mut Vec<TeamOption>,
) {
    let credits: u32 = chosen.iter().map(|driver| driver.credits).sum();
    if credits > rules.max_credits {
        return;
    }
    if chosen.len() == rules.team_size {
        if !chosen.is_empty() {
            teams.push(TeamOption {
                drivers: chosen.iter().map(|driver| driver.id.clone()).collect(),
                credits,
            });
        }
        return;
    }
    for (offset, driver) in pool.iter().enumerate().skip(start) {
        chosen.push(*driver);
        collect_teams(pool, offset + 1, rules, chosen, teams);
        chosen.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{services::normalizer::normalize, state::Snapshot};

    fn view() -> NormalizedView {
        let drivers = [("VER", 4), ("NOR", 4), ("ALO", 2), ("STR", 1), ("BEA", 1), ("ZHO", 0)]
            .map(|(id, credits)| Driver {
                id: id.into(),
                name: id.into(),
                default_team: None,
                credits,
            });
        normalize(Snapshot {
            drivers: drivers.into_iter().map(|d| (d.id.clone(), d)).collect(),
            ..Snapshot::default()
        })
    }

    fn team(ids: &[&str]) -> Vec<DriverId> {
        ids.iter().map(|id| DriverId::from(*id)).collect()
    }

    #[test]
    fn legal_team_returns_its_cost() {
        let rules = LeagueRules::default();
        assert_eq!(validate_team(&view(), &team(&["VER", "BEA"]), &rules).unwrap(), 5);
    }

    #[test]
    fn illegal_teams_are_rejected() {
        let rules = LeagueRules::default();
        let view = view();
        for ids in [&["VER", "NOR"][..], &["VER"], &["BEA", "BEA"], &["ALO", "STR", "BEA"]] {
            assert!(matches!(
                validate_team(&view, &team(ids), &rules),
                Err(ServiceError::InvalidInput(_))
            ));
        }
        assert!(matches!(
            validate_team(&view, &team(&["VER", "XXX"]), &rules),
            Err(ServiceError::UnknownEntity {
                kind: EntityKind::Driver,
                ..
            })
        ));
    }

    #[test]
    fn available_teams_skip_reserves_and_respect_the_budget() {
        let teams = available_teams(&view(), &LeagueRules::default());
        assert!(teams.iter().all(|t| t.credits <= 5 && t.drivers.len() == 2));
        assert!(
            teams
                .iter()
                .all(|t| !t.drivers.contains(&DriverId::from("ZHO")))
        );
        assert_eq!(teams[0].credits, 5);
        assert_eq!(teams.last().map(|t| t.credits), Some(2));
        // VER/NOR busts the budget; VER pairs with STR and BEA only.
        assert_eq!(teams.len(), 7);
    }
}
