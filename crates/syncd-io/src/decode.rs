use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use syncd_core::{RawTable, SyncError};

/// Decodes a spreadsheet byte stream into a `sheet_name -> RawTable` map.
///
/// The first non-empty row of each sheet supplies its header; empty sheets
/// are dropped from the result. `calamine` natively covers all four
/// required encodings (`.xlsx .xls .xlsm .xlsb`) from an in-memory buffer —
/// no temp files, no network calls. A malformed workbook yields
/// `SyncError::DecodeError`.
pub fn parse(bytes: &[u8]) -> Result<HashMap<String, RawTable>, SyncError> {
    let cursor = Cursor::new(bytes);
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| SyncError::DecodeError(format!("could not open workbook: {e}")))?;

    let sheet_names = workbook.sheet_names().to_owned();
    let mut tables = HashMap::with_capacity(sheet_names.len());

    for sheet_name in sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| SyncError::DecodeError(format!("sheet {sheet_name}: {e}")))?;

        let mut rows = range.rows();
        let Some(header_row) = rows.find(|row| !row_is_empty(row)) else {
            // Wholly empty sheet: drop it from the result.
            continue;
        };

        let headers: Vec<String> = header_row.iter().map(cell_to_string_required).collect();
        let mut data_rows = Vec::new();
        for row in rows {
            if row_is_empty(row) {
                continue;
            }
            let values: Vec<Option<String>> = headers
                .iter()
                .enumerate()
                .map(|(i, _)| row.get(i).map(cell_to_opt_string).unwrap_or(None))
                .collect();
            data_rows.push(values);
        }

        tables.insert(sheet_name, RawTable { headers, rows: data_rows });
    }

    Ok(tables)
}

fn row_is_empty(row: &[Data]) -> bool {
    row.iter().all(|cell| matches!(cell, Data::Empty))
}

fn cell_to_string_required(cell: &Data) -> String {
    cell_to_opt_string(cell).unwrap_or_default()
}

fn cell_to_opt_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(format_float(*f)),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => Some(dt.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Error(e) => Some(format!("#ERROR:{e:?}")),
    }
}

/// Excel stores whole numbers as floats; avoid turning `123` into
/// `"123.0"` for a destination integer column.
fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}
