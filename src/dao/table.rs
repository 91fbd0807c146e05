//! Rectangular table representation exchanged with the store backends.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Date, macros::format_description};

/// Julian day of 1899-12-30, day zero of spreadsheet date serials.
const SERIAL_EPOCH_JULIAN_DAY: i32 = 2_415_019;

/// The seven tables persisted by a league store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TableName {
    /// Race calendar.
    Races,
    /// Driver reference data.
    Drivers,
    /// Constructor teams.
    Teams,
    /// Player to driver picks.
    PlayerPicks,
    /// Driver substitutions.
    DriverAssignments,
    /// Season-to-date driver points.
    RaceResults,
    /// Season-to-date player points.
    PlayerResults,
}

impl TableName {
    /// Every table, in the order they are laid out in a store file.
    pub const ALL: [TableName; 7] = [
        TableName::Races,
        TableName::Drivers,
        TableName::Teams,
        TableName::PlayerPicks,
        TableName::DriverAssignments,
        TableName::RaceResults,
        TableName::PlayerResults,
    ];

    /// Name of the table (sheet name / JSON key) inside the store.
    pub fn as_str(self) -> &'static str {
        match self {
            TableName::Races => "Races",
            TableName::Drivers => "Drivers",
            TableName::Teams => "Teams",
            TableName::PlayerPicks => "PlayerPicks",
            TableName::DriverAssignments => "DriverAssignments",
            TableName::RaceResults => "RaceResults",
            TableName::PlayerResults => "PlayerResults",
        }
    }

    /// Resolve a stored table name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.as_str() == name)
    }

    /// Full column layout written for this table.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            TableName::Races => &["RaceID", "Name", "Date", "Status"],
            TableName::Drivers => &["DriverID", "Name", "DefaultTeam", "Credits"],
            TableName::Teams => &["TeamID", "Name"],
            TableName::PlayerPicks => &["PlayerID", "PlayerName", "DriverID", "FromDate", "ToDate"],
            TableName::DriverAssignments => {
                &["RaceID", "DriverID", "TeamID", "SubstitutedForDriverID"]
            }
            TableName::RaceResults => &["RaceID", "DriverID", "Points"],
            TableName::PlayerResults => &["RaceID", "PlayerID", "Points", "CalculationDetails"],
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// No value.
    Empty,
    /// Numeric value.
    Number(f64),
    /// Free text.
    Text(String),
    /// Calendar date.
    Date(Date),
}

impl Cell {
    /// Text content, with integral numbers rendered without a fraction.
    ///
    /// Blank text counts as empty.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Cell::Number(value) => Some(format_number(*value)),
            Cell::Date(date) => Some(format_date(*date)),
        }
    }

    /// Numeric content; text is parsed leniently.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) if value.is_finite() => Some(*value),
            Cell::Text(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Date content. Accepts ISO dates (optionally followed by a time part) and
    /// spreadsheet day serials.
    pub fn as_date(&self) -> Option<Date> {
        match self {
            Cell::Date(date) => Some(*date),
            Cell::Text(text) => parse_date(text),
            Cell::Number(serial) => date_from_serial(*serial),
            Cell::Empty => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<Date> for Cell {
    fn from(value: Date) -> Self {
        Cell::Date(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// Header plus rows, as read from or written to a store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableData {
    /// Header names, in stored order.
    pub columns: Vec<String>,
    /// Rows; may be shorter than the header.
    pub rows: Vec<Vec<Cell>>,
}

impl TableData {
    /// An empty table carrying the canonical header of `table`.
    pub fn empty(table: TableName) -> Self {
        Self {
            columns: table.columns().iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Position of `column` in the header, if present.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.trim() == column)
    }

    /// Cell at `row`/`column`; short rows read as empty.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&Cell::Empty)
    }

    /// Overwrite one cell, padding short rows. Returns `false` when `row` does not exist.
    pub fn set_cell(&mut self, row: usize, column: usize, cell: Cell) -> bool {
        let Some(cells) = self.rows.get_mut(row) else {
            return false;
        };
        if cells.len() <= column {
            cells.resize(column + 1, Cell::Empty);
        }
        cells[column] = cell;
        true
    }

    /// Position of `column`, appending it to the header when absent.
    pub fn ensure_column(&mut self, column: &str) -> usize {
        match self.column_index(column) {
            Some(index) => index,
            None => {
                self.columns.push(column.to_string());
                self.columns.len() - 1
            }
        }
    }

    /// Rows whose text in `column` equals `value`.
    pub fn rows_matching<'a>(
        &'a self,
        column: &str,
        value: &'a str,
    ) -> impl Iterator<Item = usize> + 'a {
        let index = self.column_index(column);
        (0..self.rows.len()).filter(move |row| {
            index.is_some_and(|index| self.cell(*row, index).as_text().as_deref() == Some(value))
        })
    }
}

/// Render an ISO `YYYY-MM-DD` date.
pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// Parse an ISO date, ignoring any trailing time component.
pub fn parse_date(text: &str) -> Option<Date> {
    let text = text.trim();
    let head = text.get(..10).unwrap_or(text);
    Date::parse(head, format_description!("[year]-[month]-[day]")).ok()
}

/// Convert a spreadsheet day serial (fractional part is the time of day).
pub fn date_from_serial(serial: f64) -> Option<Date> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    Date::from_julian_day(SERIAL_EPOCH_JULIAN_DAY + serial.trunc() as i32).ok()
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
