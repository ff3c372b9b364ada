use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

use syncd_core::{ColumnSpec, NormalizedRow, NormalizedTable, RawTable, SqlType, SqlValue, SyncError, TableSpec};

/// Closed set of destination dialect keywords. Column identifiers matching
/// any of these case-insensitively are rejected — see spec glossary
/// "Reserved destination keywords".
pub const RESERVED_KEYWORDS: &[&str] = &[
    "select", "from", "where", "insert", "update", "delete", "create", "drop", "alter", "table",
    "column", "index", "primary", "foreign", "key", "constraint", "null", "not", "unique",
    "default", "check", "references", "on", "cascade", "restrict", "set", "user", "order",
    "group", "having", "union", "join", "inner", "left", "right", "full", "outer", "cross",
    "natural", "using", "as", "distinct", "all", "any", "some", "exists", "in", "between", "like",
    "ilike", "similar", "is", "and", "or", "case", "when", "then", "else", "end",
];

/// Result of normalizing one decoded sheet: the typed table plus any
/// per-row coercion errors. Schema-level problems (unknown/missing/invalid
/// columns) are returned as the outer `Err` and abort the whole sheet; a
/// per-row coercion failure is collected here instead, and the offending
/// row is dropped from `table.rows`.
pub struct NormalizeOutcome {
    pub table: NormalizedTable,
    pub row_errors: Vec<SyncError>,
}

/// Validates, maps, projects, and coerces a raw decoded sheet against a
/// `TableSpec`, per spec §4.3 steps 1–5.
pub fn normalize(spec: &TableSpec, raw: &RawTable) -> Result<NormalizeOutcome, SyncError> {
    for header in &raw.headers {
        validate_header(header).map_err(|detail| SyncError::SchemaMismatch {
            sheet: spec.sheet_name.clone(),
            detail,
        })?;
    }

    // Step 2 + 3: every raw header must map to a declared column, and every
    // required declared column must be present in the sheet.
    let mut header_to_column: Vec<Option<&ColumnSpec>> = Vec::with_capacity(raw.headers.len());
    for header in &raw.headers {
        let column = spec.column_for_header(header).ok_or_else(|| SyncError::SchemaMismatch {
            sheet: spec.sheet_name.clone(),
            detail: format!("unexpected column: {header}"),
        })?;
        header_to_column.push(Some(column));
    }

    for column in &spec.columns {
        let present = raw.headers.iter().any(|h| h == &column.source_header);
        if !present && column.is_required {
            return Err(SyncError::SchemaMismatch {
                sheet: spec.sheet_name.clone(),
                detail: format!("missing required column: {}", column.source_header),
            });
        }
    }

    // Index of each declared column's position in the raw row, if present.
    let raw_index_for: Vec<Option<usize>> = spec
        .columns
        .iter()
        .map(|col| raw.headers.iter().position(|h| h == &col.source_header))
        .collect();

    let mut rows = Vec::with_capacity(raw.rows.len());
    let mut row_errors = Vec::new();

    'rows: for raw_row in &raw.rows {
        let mut values = Vec::with_capacity(spec.columns.len());
        for (col_idx, column) in spec.columns.iter().enumerate() {
            let raw_cell = raw_index_for[col_idx].and_then(|i| raw_row.get(i)).cloned().flatten();
            match coerce_cell(column, raw_cell.as_deref()) {
                Ok(value) => values.push(value),
                Err(err) => {
                    row_errors.push(err);
                    continue 'rows;
                }
            }
        }
        rows.push(NormalizedRow {
            values,
            processed_file_id: None,
        });
    }

    Ok(NormalizeOutcome {
        table: NormalizedTable {
            spec: spec.clone(),
            rows,
        },
        row_errors,
    })
}

/// Rejects unquotable identifiers; deliberately permissive of non-ASCII
/// scripts, spaces, and punctuation that a quoted identifier can carry.
fn validate_header(header: &str) -> Result<(), String> {
    if header.trim().is_empty() {
        return Err("column header is empty or whitespace".to_string());
    }
    // Bytes, not chars: this mirrors Postgres's NAMEDATALEN truncation, which
    // is byte-based, so a multi-byte header is rejected here rather than
    // silently truncated at the same boundary by the destination.
    if header.len() > 63 {
        return Err(format!("column header exceeds 63 bytes: {header}"));
    }
    if header.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        return Err(format!("column header starts with a digit: {header}"));
    }
    if header.chars().any(|c| c != '\t' && (c as u32) < 0x20) {
        return Err(format!("column header contains a control character: {header}"));
    }
    if RESERVED_KEYWORDS.contains(&header.to_lowercase().as_str()) {
        return Err(format!("column header is a reserved keyword: {header}"));
    }
    Ok(())
}

fn coerce_cell(column: &ColumnSpec, raw: Option<&str>) -> Result<SqlValue, SyncError> {
    let trimmed = raw.map(str::trim).filter(|s| !s.is_empty());

    let Some(text) = trimmed else {
        return if column.is_required {
            Err(coerce_err(column, "missing value for required column"))
        } else {
            Ok(SqlValue::Null)
        };
    };

    match column.sql_type {
        SqlType::Text => {
            if let Some(max_len) = column.max_length {
                if text.chars().count() > max_len as usize {
                    return Err(coerce_err(
                        column,
                        &format!("value exceeds max_length {max_len}"),
                    ));
                }
            }
            Ok(SqlValue::Text(text.to_string()))
        }
        SqlType::Integer => text
            .parse::<i32>()
            .map(SqlValue::Integer)
            .map_err(|e| coerce_err(column, &format!("not a valid integer: {e}"))),
        SqlType::BigInt => text
            .parse::<i64>()
            .map(SqlValue::BigInt)
            .map_err(|e| coerce_err(column, &format!("not a valid bigint: {e}"))),
        SqlType::Numeric(_, scale) => {
            let mut decimal = Decimal::from_str(text)
                .map_err(|e| coerce_err(column, &format!("not a valid numeric: {e}")))?;
            decimal.rescale(scale as u32);
            Ok(SqlValue::Numeric(decimal))
        }
        SqlType::Date => parse_date(text)
            .map(SqlValue::Date)
            .map_err(|_| coerce_err(column, &format!("not a valid date: {text}"))),
        SqlType::Timestamp => parse_timestamp(text)
            .map(SqlValue::Timestamp)
            .map_err(|_| coerce_err(column, &format!("not a valid timestamp: {text}"))),
        SqlType::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(SqlValue::Boolean(true)),
            "false" | "0" => Ok(SqlValue::Boolean(false)),
            _ => Err(coerce_err(column, &format!("not a valid boolean: {text}"))),
        },
    }
}

fn coerce_err(column: &ColumnSpec, detail: &str) -> SyncError {
    SyncError::CoerceError {
        table: column.destination_column.clone(),
        column: column.destination_column.clone(),
        detail: detail.to_string(),
    }
}

fn parse_date(text: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
}

fn parse_timestamp(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    const FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
    let mut last_err = None;
    for format in FORMATS {
        match NaiveDateTime::parse_from_str(text, format) {
            Ok(dt) => return Ok(dt),
            Err(e) => last_err = Some(e),
        }
    }
    // A bare date is an acceptable timestamp: midnight on that day.
    if let Ok(date) = parse_date(text) {
        return Ok(date.and_hms_opt(0, 0, 0).expect("midnight is always valid"));
    }
    Err(last_err.expect("FORMATS is non-empty"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncd_core::ColumnSpec;

    fn sample_spec() -> TableSpec {
        TableSpec::new(
            "新規to業務管理",
            "contract_creation",
            vec![
                ColumnSpec::new("契約ID", "contract_id", SqlType::Text).key(),
                ColumnSpec::new("物件No", "property_no", SqlType::Integer),
                ColumnSpec::new("出力日時", "output_at", SqlType::Timestamp),
            ],
        )
    }

    #[test]
    fn happy_path_coerces_every_column() {
        let spec = sample_spec();
        let raw = RawTable {
            headers: vec!["契約ID".into(), "物件No".into(), "出力日時".into()],
            rows: vec![vec![
                Some("C001".into()),
                Some("123".into()),
                Some("2024-01-01T10:00:00".into()),
            ]],
        };
        let outcome = normalize(&spec, &raw).expect("should normalize");
        assert!(outcome.row_errors.is_empty());
        assert_eq!(outcome.table.rows.len(), 1);
        assert_eq!(outcome.table.rows[0].values[0], SqlValue::Text("C001".into()));
        assert_eq!(outcome.table.rows[0].values[1], SqlValue::Integer(123));
    }

    #[test]
    fn unexpected_header_is_schema_mismatch() {
        let spec = sample_spec();
        let raw = RawTable {
            headers: vec!["契約ID".into(), "物件No".into(), "出力日時".into(), "Extra".into()],
            rows: vec![],
        };
        let err = normalize(&spec, &raw).unwrap_err();
        assert!(matches!(err, SyncError::SchemaMismatch { .. }));
    }

    #[test]
    fn missing_required_column_is_schema_mismatch() {
        let spec = sample_spec();
        let raw = RawTable {
            headers: vec!["契約ID".into(), "物件No".into()],
            rows: vec![],
        };
        let err = normalize(&spec, &raw).unwrap_err();
        assert!(matches!(err, SyncError::SchemaMismatch { .. }));
    }

    #[test]
    fn bad_row_is_skipped_not_fatal() {
        let spec = sample_spec();
        let raw = RawTable {
            headers: vec!["契約ID".into(), "物件No".into(), "出力日時".into()],
            rows: vec![
                vec![Some("C001".into()), Some("not-a-number".into()), Some("2024-01-01T10:00:00".into())],
                vec![Some("C002".into()), Some("5".into()), Some("2024-01-01T10:00:00".into())],
            ],
        };
        let outcome = normalize(&spec, &raw).expect("should normalize");
        assert_eq!(outcome.row_errors.len(), 1);
        assert_eq!(outcome.table.rows.len(), 1);
    }

    #[test]
    fn cjk_and_punctuation_headers_are_valid() {
        assert!(validate_header("契約ID").is_ok());
        assert!(validate_header("Amount (JPY)").is_ok());
        assert!(validate_header("user@domain").is_ok());
        assert!(validate_header("foo.bar#1").is_ok());
    }

    #[test]
    fn reserved_keyword_header_is_rejected() {
        assert!(validate_header("select").is_err());
        assert!(validate_header("SELECT").is_err());
    }

    #[test]
    fn header_starting_with_digit_is_rejected() {
        assert!(validate_header("1st_column").is_err());
    }

    #[test]
    fn boolean_accepts_expected_literals() {
        let col = ColumnSpec::new("flag", "flag", SqlType::Boolean);
        assert_eq!(coerce_cell(&col, Some("TRUE")).unwrap(), SqlValue::Boolean(true));
        assert_eq!(coerce_cell(&col, Some("0")).unwrap(), SqlValue::Boolean(false));
        assert!(coerce_cell(&col, Some("maybe")).is_err());
    }

    #[test]
    fn empty_cell_is_null_when_not_required() {
        let col = ColumnSpec::new("note", "note", SqlType::Text).required(false);
        assert_eq!(coerce_cell(&col, Some("   ")).unwrap(), SqlValue::Null);
        assert_eq!(coerce_cell(&col, None).unwrap(), SqlValue::Null);
    }

    #[test]
    fn empty_cell_on_required_column_errors() {
        let col = ColumnSpec::new("note", "note", SqlType::Text);
        assert!(coerce_cell(&col, Some("")).is_err());
    }

    proptest::proptest! {
        #[test]
        fn normalizing_a_normalized_table_is_a_fixed_point(a in 1i32..1_000_000) {
            let spec = TableSpec::new("Sheet", "t", vec![ColumnSpec::new("n", "n", SqlType::Integer)]);
            let raw = RawTable { headers: vec!["n".into()], rows: vec![vec![Some(a.to_string())]] };
            let first = normalize(&spec, &raw).unwrap();
            let round_tripped = RawTable {
                headers: vec!["n".into()],
                rows: first
                    .table
                    .rows
                    .iter()
                    .map(|r| vec![match &r.values[0] {
                        SqlValue::Integer(v) => Some(v.to_string()),
                        _ => None,
                    }])
                    .collect(),
            };
            let second = normalize(&spec, &round_tripped).unwrap();
            prop_assert_eq!(first.table.rows[0].values[0].clone(), second.table.rows[0].values[0].clone());
        }
    }
}
