use calamine::{Data, Range};
use rust_xlsxwriter::{ColNum, Format, RowNum, Worksheet};

use crate::dao::table::{Cell, TableData, format_date};

/// Convert a sheet range into a table; the first row is the header.
pub(super) fn table_from_range(range: &Range<Data>) -> TableData {
    // Ranges start at the first used cell, pad back to column A.
    let leading = range.start().map(|(_, column)| column as usize).unwrap_or(0);

    let mut rows = range.rows().map(|row| {
        std::iter::repeat_n(Cell::Empty, leading)
            .chain(row.iter().map(cell_from_data))
            .collect::<Vec<_>>()
    });
    let columns = rows
        .next()
        .map(|header| {
            header
                .iter()
                .map(|cell| cell.as_text().unwrap_or_default())
                .collect()
        })
        .unwrap_or_default();

    TableData {
        columns,
        rows: rows.collect(),
    }
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Float(value) => Cell::Number(*value),
        Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => {
            Cell::Text(text.clone())
        }
        Data::Bool(flag) => Cell::Text(flag.to_string()),
        // Date serials are resolved by `Cell::as_date`.
        Data::DateTime(value) => Cell::Number(value.as_f64()),
    }
}

/// Write `table` into `worksheet`, header first in bold.
pub(super) fn write_table(
    worksheet: &mut Worksheet,
    table: &TableData,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    let header = Format::new().set_bold();
    for (column, name) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, column as ColNum, name, &header)?;
    }

    for (index, row) in table.rows.iter().enumerate() {
        let row_number = index as RowNum + 1;
        for (column, cell) in row.iter().enumerate() {
            let column = column as ColNum;
            match cell {
                Cell::Empty => {}
                Cell::Number(value) => {
                    worksheet.write_number(row_number, column, *value)?;
                }
                Cell::Text(text) => {
                    worksheet.write_string(row_number, column, text)?;
                }
                Cell::Date(date) => {
                    worksheet.write_string(row_number, column, format_date(*date))?;
                }
            }
        }
    }
    Ok(())
}
