use std::{borrow::Borrow, collections::HashMap, fmt};

use serde::Serialize;
use thiserror::Error;
use time::Date;

use crate::dao::table::{Cell, TableData, TableName};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier, trimming surrounding whitespace.
            pub fn new(id: impl Into<String>) -> Self {
                let id = id.into();
                Self(id.trim().to_string())
            }

            /// Borrow the identifier text.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id!(
    /// Race identifier (e.g. `AUS`).
    RaceId
);
string_id!(
    /// Driver identifier (three-letter code).
    DriverId
);
string_id!(
    /// Constructor team identifier.
    TeamId
);
string_id!(
    /// Fantasy player identifier.
    PlayerId
);

/// Lifecycle of a race on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RaceStatus {
    /// Not raced yet.
    Upcoming,
    /// Raced; results are recorded.
    Completed,
}

impl RaceStatus {
    /// Stored status text.
    pub fn as_str(self) -> &'static str {
        match self {
            RaceStatus::Upcoming => "Upcoming",
            RaceStatus::Completed => "Completed",
        }
    }
}

/// Calendar entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Race {
    /// Calendar identifier.
    pub id: RaceId,
    /// Display name.
    pub name: String,
    /// Race day.
    pub date: Date,
    /// Lifecycle state.
    pub status: RaceStatus,
}

impl Race {
    /// Whether the race counts as an event.
    pub fn is_completed(&self) -> bool {
        self.status == RaceStatus::Completed
    }
}

/// Reference data for a driver. Reserve drivers cost 0 credits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Driver {
    /// Three-letter code.
    pub id: DriverId,
    /// Full name.
    pub name: String,
    /// Team the driver normally races for.
    pub default_team: Option<TeamId>,
    /// Cost in team credits.
    pub credits: u32,
}

impl Driver {
    /// Reserve drivers cost no credits.
    pub fn is_reserve(&self) -> bool {
        self.credits == 0
    }
}

/// Constructor team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Team {
    /// Team code.
    pub id: TeamId,
    /// Display name.
    pub name: String,
}

/// Time-sliced ownership of a driver by a player.
///
/// A missing `from_date` means the pick has been held since before the season;
/// a missing `to_date` means it is still open.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerPick {
    /// Owning player.
    pub player_id: PlayerId,
    /// Player display name, repeated on every pick.
    pub player_name: String,
    /// Picked driver.
    pub driver_id: DriverId,
    /// First day the pick counts.
    pub from_date: Option<Date>,
    /// Last day the pick counts.
    pub to_date: Option<Date>,
}

impl PlayerPick {
    /// Whether the interval `[from_date, to_date]` (both inclusive) covers `date`.
    pub fn is_active_on(&self, date: Date) -> bool {
        self.from_date.is_none_or(|from| from <= date) && self.to_date.is_none_or(|to| date <= to)
    }

    /// Whether the pick has no end date.
    pub fn is_open(&self) -> bool {
        self.to_date.is_none()
    }
}

/// Substitution: for `race_id`, `driver_id` raced for `team_id` in place of `substituted_for`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverAssignment {
    /// Race the substitution applies to.
    pub race_id: RaceId,
    /// Driver who raced.
    pub driver_id: DriverId,
    /// Team the substitute raced for.
    pub team_id: Option<TeamId>,
    /// Driver who was replaced.
    pub substituted_for: DriverId,
}

/// Stored driver result. `points` is the season-to-date total as of the race.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceResult {
    /// Race the total was recorded after.
    pub race_id: RaceId,
    /// Scored driver.
    pub driver_id: DriverId,
    /// Season-to-date points.
    pub points: f64,
}

/// Stored player result. `points` is the season-to-date total as of the race.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerResult {
    /// Race the total was recorded after.
    pub race_id: RaceId,
    /// Scored player.
    pub player_id: PlayerId,
    /// Season-to-date points.
    pub points: f64,
    /// Per-driver breakdown, e.g. `VER: 18, NOR: 12`.
    pub calculation_details: String,
}

/// Reason a single row could not be decoded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    /// The cell is empty.
    #[error("missing value for column `{column}`")]
    Missing {
        /// Column header.
        column: &'static str,
    },
    /// The cell holds a value of the wrong kind.
    #[error("invalid value for column `{column}`")]
    Invalid {
        /// Column header.
        column: &'static str,
    },
}

/// Typed view over one row of a table.
pub struct RowReader<'a> {
    data: &'a TableData,
    columns: &'a HashMap<&'static str, usize>,
    row: usize,
}

impl RowReader<'_> {
    fn cell(&self, column: &'static str) -> &Cell {
        match self.columns.get(column) {
            Some(index) => self.data.cell(self.row, *index),
            None => &Cell::Empty,
        }
    }

    /// Text of `column`, if any.
    pub fn optional_text(&self, column: &'static str) -> Option<String> {
        self.cell(column).as_text()
    }

    /// Text of `column`.
    pub fn text(&self, column: &'static str) -> Result<String, RowError> {
        self.optional_text(column)
            .ok_or(RowError::Missing { column })
    }

    /// Number in `column`.
    pub fn number(&self, column: &'static str) -> Result<f64, RowError> {
        match self.cell(column) {
            Cell::Empty => Err(RowError::Missing { column }),
            cell => cell.as_number().ok_or(RowError::Invalid { column }),
        }
    }

    /// Date in `column`, if any.
    pub fn optional_date(&self, column: &'static str) -> Result<Option<Date>, RowError> {
        match self.cell(column) {
            Cell::Empty => Ok(None),
            Cell::Text(text) if text.trim().is_empty() => Ok(None),
            cell => cell.as_date().map(Some).ok_or(RowError::Invalid { column }),
        }
    }

    /// Date in `column`.
    pub fn date(&self, column: &'static str) -> Result<Date, RowError> {
        self.optional_date(column)?
            .ok_or(RowError::Missing { column })
    }
}

/// A typed record persisted as one row of a store table.
pub trait Record: Sized {
    /// Table the record is stored in.
    const TABLE: TableName;
    /// Columns that must be present in the header for the table to be usable.
    const REQUIRED: &'static [&'static str];

    /// Build a record from one row.
    fn decode(row: &RowReader<'_>) -> Result<Self, RowError>;

    /// Cells in the order of [`TableName::columns`].
    fn encode(&self) -> Vec<Cell>;
}

/// Outcome of decoding a whole table: the good rows plus the rejected ones.
#[derive(Debug)]
pub struct Decoded<R> {
    /// Successfully decoded rows.
    pub records: Vec<R>,
    /// Rejected rows with their zero-based index.
    pub rejected: Vec<(usize, RowError)>,
}

/// Decode every row of `data` as `R`.
///
/// Fails with the name of the first required column missing from the header.
/// Rows that are entirely blank are ignored.
pub fn decode_rows<R: Record>(data: &TableData) -> Result<Decoded<R>, &'static str> {
    let mut columns = HashMap::new();
    for column in R::TABLE.columns() {
        if let Some(index) = data.column_index(column) {
            columns.insert(*column, index);
        }
    }
    if let Some(missing) = R::REQUIRED.iter().find(|c| !columns.contains_key(*c)) {
        return Err(*missing);
    }

    let mut records = Vec::with_capacity(data.rows.len());
    let mut rejected = Vec::new();
    for (row, cells) in data.rows.iter().enumerate() {
        if cells.iter().all(|cell| cell.as_text().is_none()) {
            continue;
        }
        let reader = RowReader {
            data,
            columns: &columns,
            row,
        };
        match R::decode(&reader) {
            Ok(record) => records.push(record),
            Err(err) => rejected.push((row, err)),
        }
    }

    Ok(Decoded { records, rejected })
}

/// Encode `records` under the canonical header of `R::TABLE`.
pub fn encode_rows<'a, R: Record + 'a>(records: impl IntoIterator<Item = &'a R>) -> TableData {
    let mut data = TableData::empty(R::TABLE);
    data.rows = records.into_iter().map(Record::encode).collect();
    data
}

/// Append `records` to `data`, placing each value under its column name.
///
/// Columns missing from the header are added; other columns are left blank.
pub fn append_records<'a, R: Record + 'a>(
    data: &mut TableData,
    records: impl IntoIterator<Item = &'a R>,
) {
    let positions: Vec<usize> = R::TABLE
        .columns()
        .iter()
        .map(|column| data.ensure_column(column))
        .collect();
    for record in records {
        let mut row = vec![Cell::Empty; data.columns.len()];
        for (cell, position) in record.encode().into_iter().zip(&positions) {
            row[*position] = cell;
        }
        data.rows.push(row);
    }
}

impl Record for Race {
    const TABLE: TableName = TableName::Races;
    const REQUIRED: &'static [&'static str] = &["RaceID", "Name", "Date", "Status"];

    fn decode(row: &RowReader<'_>) -> Result<Self, RowError> {
        let status = match row.optional_text("Status").as_deref() {
            Some(status) if status.eq_ignore_ascii_case("completed") => RaceStatus::Completed,
            _ => RaceStatus::Upcoming,
        };
        Ok(Self {
            id: row.text("RaceID")?.into(),
            name: row.optional_text("Name").unwrap_or_default(),
            date: row.date("Date")?,
            status,
        })
    }

    fn encode(&self) -> Vec<Cell> {
        vec![
            self.id.as_str().into(),
            self.name.as_str().into(),
            self.date.into(),
            self.status.as_str().into(),
        ]
    }
}

impl Record for Driver {
    const TABLE: TableName = TableName::Drivers;
    const REQUIRED: &'static [&'static str] = &["DriverID", "Name"];

    fn decode(row: &RowReader<'_>) -> Result<Self, RowError> {
        let credits = match row.number("Credits") {
            Ok(credits) => credits.max(0.0).round() as u32,
            Err(RowError::Missing { .. }) => 0,
            Err(err) => return Err(err),
        };
        Ok(Self {
            id: row.text("DriverID")?.into(),
            name: row.optional_text("Name").unwrap_or_default(),
            default_team: row.optional_text("DefaultTeam").map(TeamId::new),
            credits,
        })
    }

    fn encode(&self) -> Vec<Cell> {
        vec![
            self.id.as_str().into(),
            self.name.as_str().into(),
            self.default_team.as_ref().map(TeamId::as_str).into(),
            f64::from(self.credits).into(),
        ]
    }
}

impl Record for Team {
    const TABLE: TableName = TableName::Teams;
    const REQUIRED: &'static [&'static str] = &["TeamID", "Name"];

    fn decode(row: &RowReader<'_>) -> Result<Self, RowError> {
        Ok(Self {
            id: row.text("TeamID")?.into(),
            name: row.optional_text("Name").unwrap_or_default(),
        })
    }

    fn encode(&self) -> Vec<Cell> {
        vec![self.id.as_str().into(), self.name.as_str().into()]
    }
}

impl Record for PlayerPick {
    const TABLE: TableName = TableName::PlayerPicks;
    const REQUIRED: &'static [&'static str] = &["PlayerID", "PlayerName", "DriverID"];

    fn decode(row: &RowReader<'_>) -> Result<Self, RowError> {
        let player_id: PlayerId = row.text("PlayerID")?.into();
        Ok(Self {
            player_name: row
                .optional_text("PlayerName")
                .unwrap_or_else(|| format!("Player {player_id}")),
            player_id,
            driver_id: row.text("DriverID")?.into(),
            from_date: row.optional_date("FromDate")?,
            to_date: row.optional_date("ToDate")?,
        })
    }

    fn encode(&self) -> Vec<Cell> {
        vec![
            self.player_id.as_str().into(),
            self.player_name.as_str().into(),
            self.driver_id.as_str().into(),
            self.from_date.into(),
            self.to_date.into(),
        ]
    }
}

impl Record for DriverAssignment {
    const TABLE: TableName = TableName::DriverAssignments;
    const REQUIRED: &'static [&'static str] = &["RaceID", "DriverID", "SubstitutedForDriverID"];

    fn decode(row: &RowReader<'_>) -> Result<Self, RowError> {
        Ok(Self {
            race_id: row.text("RaceID")?.into(),
            driver_id: row.text("DriverID")?.into(),
            team_id: row.optional_text("TeamID").map(TeamId::new),
            substituted_for: row.text("SubstitutedForDriverID")?.into(),
        })
    }

    fn encode(&self) -> Vec<Cell> {
        vec![
            self.race_id.as_str().into(),
            self.driver_id.as_str().into(),
            self.team_id.as_ref().map(TeamId::as_str).into(),
            self.substituted_for.as_str().into(),
        ]
    }
}

impl Record for RaceResult {
    const TABLE: TableName = TableName::RaceResults;
    const REQUIRED: &'static [&'static str] = &["RaceID", "DriverID", "Points"];

    fn decode(row: &RowReader<'_>) -> Result<Self, RowError> {
        Ok(Self {
            race_id: row.text("RaceID")?.into(),
            driver_id: row.text("DriverID")?.into(),
            points: row.number("Points")?,
        })
    }

    fn encode(&self) -> Vec<Cell> {
        vec![
            self.race_id.as_str().into(),
            self.driver_id.as_str().into(),
            self.points.into(),
        ]
    }
}

impl Record for PlayerResult {
    const TABLE: TableName = TableName::PlayerResults;
    const REQUIRED: &'static [&'static str] = &["RaceID", "PlayerID", "Points"];

    fn decode(row: &RowReader<'_>) -> Result<Self, RowError> {
        Ok(Self {
            race_id: row.text("RaceID")?.into(),
            player_id: row.text("PlayerID")?.into(),
            points: row.number("Points")?,
            calculation_details: row.optional_text("CalculationDetails").unwrap_or_default(),
        })
    }

    fn encode(&self) -> Vec<Cell> {
        vec![
            self.race_id.as_str().into(),
            self.player_id.as_str().into(),
            self.points.into(),
            self.calculation_details.as_str().into(),
        ]
    }
}
