//! Reference data for a season and bootstrapping of an empty store.

use time::{Date, Month};
use tracing::info;

use crate::{
    dao::{
        models::{Driver, Race, RaceStatus, Record, Team, decode_rows, encode_rows},
        table::{TableData, TableName},
    },
    error::ServiceError,
    state::ScoringSession,
};

/// Calendar, teams and drivers of one season.
#[derive(Debug, Clone)]
pub struct SeasonData {
    /// Season year.
    pub year: i32,
    /// Calendar, all upcoming.
    pub races: Vec<Race>,
    /// Constructor teams.
    pub teams: Vec<Team>,
    /// Drivers, reserves included.
    pub drivers: Vec<Driver>,
}

/// What [`initialize_season`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonSetup {
    /// Tables that did not exist and were created.
    pub created: Vec<TableName>,
    /// Reference tables that were empty and got seeded.
    pub seeded: Vec<TableName>,
}

const CALENDAR_2025: [(&str, &str, Month, u8); 24] = [
    ("AUS", "Australian Grand Prix", Month::March, 16),
    ("CHN", "Chinese Grand Prix", Month::March, 23),
    ("JPN", "Japanese Grand Prix", Month::April, 6),
    ("BHR", "Bahrain Grand Prix", Month::April, 13),
    ("SAU", "Saudi Arabian Grand Prix", Month::April, 20),
    ("MIA", "Miami Grand Prix", Month::May, 4),
    ("EMR", "Emilia Romagna Grand Prix", Month::May, 18),
    ("MON", "Monaco Grand Prix", Month::May, 25),
    ("ESP", "Spanish Grand Prix", Month::June, 1),
    ("CAN", "Canadian Grand Prix", Month::June, 15),
    ("AUT", "Austrian Grand Prix", Month::June, 29),
    ("GBR", "British Grand Prix", Month::July, 6),
    ("BEL", "Belgian Grand Prix", Month::July, 27),
    ("HUN", "Hungarian Grand Prix", Month::August, 3),
    ("NED", "Dutch Grand Prix", Month::August, 31),
    ("ITA", "Italian Grand Prix", Month::September, 7),
    ("AZE", "Azerbaijan Grand Prix", Month::September, 21),
    ("SIN", "Singapore Grand Prix", Month::October, 5),
    ("USA", "United States Grand Prix", Month::October, 19),
    ("MEX", "Mexican Grand Prix", Month::October, 26),
    ("BRA", "Brazilian Grand Prix", Month::November, 9),
    ("LVG", "Las Vegas Grand Prix", Month::November, 22),
    ("QAT", "Qatar Grand Prix", Month::November, 30),
    ("ABU", "Abu Dhabi Grand Prix", Month::December, 7),
];

const TEAMS_2025: [(&str, &str); 10] = [
    ("RBR", "Red Bull Racing"),
    ("FER", "Ferrari"),
    ("MER", "Mercedes"),
    ("MCL", "McLaren"),
    ("AST", "Aston Martin"),
    ("ALP", "Alpine"),
    ("HAS", "Haas F1 Team"),
    ("RBT", "Racing Bulls"),
    ("WIL", "Williams"),
    ("SAU", "Sauber"),
];

// Reserve drivers cost 0 credits and cannot be picked.
const DRIVERS_2025: [(&str, &str, &str, u32); 29] = [
    ("VER", "Max Verstappen", "RBR", 4),
    ("NOR", "Lando Norris", "MCL", 4),
    ("LEC", "Charles Leclerc", "FER", 4),
    ("PIA", "Oscar Piastri", "MCL", 4),
    ("HAM", "Lewis Hamilton", "FER", 4),
    ("RUS", "George Russell", "MER", 3),
    ("LAW", "Liam Lawson", "RBR", 3),
    ("ANT", "Andrea Kimi Antonelli", "MER", 3),
    ("GAS", "Pierre Gasly", "ALP", 3),
    ("SAI", "Carlos Sainz", "WIL", 3),
    ("ALO", "Fernando Alonso", "AST", 2),
    ("TSU", "Yuki Tsunoda", "RBT", 2),
    ("ALB", "Alexander Albon", "WIL", 2),
    ("HUL", "Nico Hulkenberg", "SAU", 2),
    ("OCO", "Esteban Ocon", "HAS", 2),
    ("STR", "Lance Stroll", "AST", 1),
    ("BEA", "Oliver Bearman", "HAS", 1),
    ("DOO", "Jack Doohan", "ALP", 1),
    ("HAD", "Isack Hadjar", "RBT", 1),
    ("BOR", "Gabriel Bortoleto", "SAU", 1),
    ("ZHO", "Zhou Guanyu", "FER", 0),
    ("GIO", "Antonio Giovinazzi", "FER", 0),
    ("BOT", "Valtteri Bottas", "MER", 0),
    ("VES", "Frederik Vesti", "MER", 0),
    ("DRU", "Felipe Drugovich", "AST", 0),
    ("ARO", "Paul Aron", "ALP", 0),
    ("HIR", "Ryo Hirakawa", "ALP", 0),
    ("COL", "Franco Colapinto", "ALP", 0),
    ("TUR", "Oliver Turvey", "WIL", 0),
];

/// The 2025 season, ending with the Abu Dhabi Grand Prix.
pub fn season_2025() -> SeasonData {
    let races = CALENDAR_2025
        .iter()
        .filter_map(|(id, name, month, day)| {
            Some(Race {
                id: (*id).into(),
                name: (*name).to_string(),
                date: Date::from_calendar_date(2025, *month, *day).ok()?,
                status: RaceStatus::Upcoming,
            })
        })
        .collect();
    let teams = TEAMS_2025
        .iter()
        .map(|(id, name)| Team {
            id: (*id).into(),
            name: (*name).to_string(),
        })
        .collect();
    let drivers = DRIVERS_2025
        .iter()
        .map(|(id, name, team, credits)| Driver {
            id: (*id).into(),
            name: (*name).to_string(),
            default_team: Some((*team).into()),
            credits: *credits,
        })
        .collect();

    SeasonData {
        year: 2025,
        races,
        teams,
        drivers,
    }
}

/// Create missing tables and seed the empty reference tables with `season`.
///
/// Reference tables that already hold rows are left untouched.
pub fn initialize_season(
    session: &mut ScoringSession,
    season: &SeasonData,
) -> Result<SeasonSetup, ServiceError> {
    let created = session.initialize_store()?;

    let mut seeds = Vec::new();
    push_seed(session, &season.races, &mut seeds)?;
    push_seed(session, &season.teams, &mut seeds)?;
    push_seed(session, &season.drivers, &mut seeds)?;

    let seeded: Vec<TableName> = seeds.iter().map(|(table, _)| *table).collect();
    if !seeds.is_empty() {
        session.write_tables(seeds)?;
    }

    info!(
        year = season.year,
        created = ?created,
        seeded = ?seeded,
        "season initialized"
    );
    Ok(SeasonSetup { created, seeded })
}

fn push_seed<R: Record>(
    session: &ScoringSession,
    records: &[R],
    seeds: &mut Vec<(TableName, TableData)>,
) -> Result<(), ServiceError> {
    let current = session.store().read_table(R::TABLE)?;
    let populated = decode_rows::<R>(&current)
        .map(|decoded| !decoded.records.is_empty() || !decoded.rejected.is_empty())
        .unwrap_or(!current.rows.is_empty());
    if !populated {
        seeds.push((R::TABLE, encode_rows(records)));
    }
    Ok(())
}
