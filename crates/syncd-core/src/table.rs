use crate::registry::TableSpec;
use crate::value::SqlValue;

/// Raw, untyped sheet contents as decoded by C2. Every cell is either a raw
/// string or `None` (the null sentinel for an empty cell); no type coercion
/// has happened yet.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// One row of coerced, destination-ordered values, with a placeholder slot
/// for the `processed_file_id` that C5 stamps in before the bulk load.
#[derive(Debug, Clone)]
pub struct NormalizedRow {
    pub values: Vec<SqlValue>,
    pub processed_file_id: Option<i64>,
}

/// The output of C3: a `RawTable` validated and coerced against a
/// `TableSpec`, with columns in the table's declared order.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub spec: TableSpec,
    pub rows: Vec<NormalizedRow>,
}

impl NormalizedTable {
    pub fn stamp_processed_file_id(&mut self, id: i64) {
        for row in &mut self.rows {
            row.processed_file_id = Some(id);
        }
    }
}
