use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::dao::table::{Cell, TableData, format_date};

/// On-disk shape: table name → header plus rows of scalar values.
pub(super) type LeagueDocument = IndexMap<String, JsonTable>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct JsonTable {
    /// Header names.
    pub columns: Vec<String>,
    /// Row values, one array per row.
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl From<JsonTable> for TableData {
    fn from(value: JsonTable) -> Self {
        Self {
            columns: value.columns,
            rows: value
                .rows
                .into_iter()
                .map(|row| row.into_iter().map(cell_from_value).collect())
                .collect(),
        }
    }
}

impl From<TableData> for JsonTable {
    fn from(value: TableData) -> Self {
        Self {
            columns: value.columns,
            rows: value
                .rows
                .into_iter()
                .map(|row| row.into_iter().map(value_from_cell).collect())
                .collect(),
        }
    }
}

fn cell_from_value(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::Number(number) => number.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
        Value::String(text) => Cell::Text(text),
        Value::Bool(flag) => Cell::Text(flag.to_string()),
        other => Cell::Text(other.to_string()),
    }
}

fn value_from_cell(cell: Cell) -> Value {
    match cell {
        Cell::Empty => Value::Null,
        Cell::Number(number) => Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Cell::Text(text) => Value::String(text),
        Cell::Date(date) => Value::String(format_date(date)),
    }
}
