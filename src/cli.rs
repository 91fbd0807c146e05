use std::path::PathBuf;

use clap::{Parser, Subcommand};
use league_scoring::dao::{models::DriverId, table::parse_date};
use time::Date;

/// Fantasy league scoring over a local league file.
#[derive(Parser, Debug)]
#[command(name = "league-scoring")]
#[command(version)]
#[command(about = "Score a fantasy motorsport league from cumulative race results", long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (defaults to $LEAGUE_SCORING_CONFIG_PATH or config/league.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Subcommands of the command line.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create missing tables and seed the 2025 season
    Init,
    /// List the calendar
    Races,
    /// List players and their current drivers
    Players,
    /// Player standings
    Standings,
    /// Driver standings
    Drivers,
    /// Score every player for a race
    Score {
        /// Race id
        race: String,
    },
    /// Per-player points for a race
    Breakdown {
        /// Race id
        race: String,
    },
    /// Record a driver substitution
    Substitute {
        /// Race id
        race: String,
        /// Driver who raced in place of the original
        substitute: String,
        /// Team the substitute raced for
        team: String,
        /// Driver who was replaced
        original: String,
    },
    /// Record season-to-date driver points after a race, as DRV=points
    Results {
        /// Race id
        race: String,
        /// Season-to-date points per driver
        #[arg(required = true, value_parser = parse_result)]
        points: Vec<(DriverId, f64)>,
    },
    /// Register a player with their drivers
    AddPlayer {
        /// Player id
        id: String,
        /// Display name
        name: String,
        /// Picked driver ids
        #[arg(required = true)]
        drivers: Vec<String>,
        /// First day the picks count (defaults to today)
        #[arg(long, value_parser = parse_day)]
        from: Option<Date>,
    },
    /// Swap one of a player's drivers
    ChangeDriver {
        /// Player id
        player: String,
        /// Driver being dropped
        old: String,
        /// Driver being picked
        new: String,
        /// First day the new driver counts (defaults to today)
        #[arg(long, value_parser = parse_day)]
        effective: Option<Date>,
    },
    /// List legal teams within the credit limit
    Teams,
    /// Constructor points per race
    Constructors,
    /// Driver points per credit, for the season or one race
    Efficiency {
        /// Race id (whole season when omitted)
        race: Option<String>,
    },
    /// Copy the league file aside
    Backup,
}

fn parse_result(value: &str) -> Result<(DriverId, f64), String> {
    let (driver, points) = value
        .split_once('=')
        .ok_or_else(|| format!("expected DRV=points, got `{value}`"))?;
    let points = points
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid points for `{driver}`: {err}"))?;
    Ok((DriverId::new(driver), points))
}

fn parse_day(value: &str) -> Result<Date, String> {
    parse_date(value).ok_or_else(|| format!("expected YYYY-MM-DD, got `{value}`"))
}
