use std::collections::HashMap;

/// Destination SQL type family. Mirrors the families spec §4.3 requires the
/// normalizer to coerce into; `Numeric` carries precision/scale because the
/// coercion and the eventual `COPY` encoding both need them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    BigInt,
    Numeric(u8, u8),
    Date,
    Timestamp,
    Text,
    Boolean,
}

/// Declarative description of one destination column.
///
/// `source_header` is the exact string expected in the sheet's header row;
/// `destination_column` is the identifier written to the warehouse. The two
/// are allowed to differ (rename-on-ingest).
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub source_header: String,
    pub destination_column: String,
    pub sql_type: SqlType,
    pub is_required: bool,
    pub is_key: bool,
    pub has_index: bool,
    pub max_length: Option<u32>,
    pub uses_identity: bool,
}

impl ColumnSpec {
    pub fn new(source_header: &str, destination_column: &str, sql_type: SqlType) -> Self {
        Self {
            source_header: source_header.to_string(),
            destination_column: destination_column.to_string(),
            sql_type,
            is_required: true,
            is_key: false,
            has_index: false,
            max_length: None,
            uses_identity: false,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.is_required = required;
        self
    }

    pub fn key(mut self) -> Self {
        self.is_key = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.has_index = true;
        self
    }

    pub fn max_length(mut self, len: u32) -> Self {
        self.max_length = Some(len);
        self
    }
}

/// Declarative description of one destination table, bound one-to-one to a
/// source sheet name.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub sheet_name: String,
    pub table_name: String,
    pub schema_name: Option<String>,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn new(sheet_name: &str, table_name: &str, columns: Vec<ColumnSpec>) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            table_name: table_name.to_string(),
            schema_name: None,
            columns,
        }
    }

    pub fn with_schema(mut self, schema_name: &str) -> Self {
        self.schema_name = Some(schema_name.to_string());
        self
    }

    /// Fully-qualified destination table name for use in SQL.
    pub fn qualified_name(&self) -> String {
        match &self.schema_name {
            Some(schema) => format!("{schema}.{}", self.table_name),
            None => self.table_name.clone(),
        }
    }

    /// Looks up the destination mapping for a raw source header. Strict:
    /// callers that fail this lookup must reject the column outright, per
    /// C3 step 2.
    pub fn column_for_header(&self, header: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.source_header == header)
    }
}

/// Immutable, in-memory catalog of destination tables. Built once at
/// start-up from a static list — no reflection, no runtime scanning, per the
/// "runtime-reflected entity metadata" REDESIGN FLAG.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    by_sheet: HashMap<String, TableSpec>,
    order: Vec<String>,
}

impl SchemaRegistry {
    pub fn new(tables: Vec<TableSpec>) -> Self {
        let mut by_sheet = HashMap::with_capacity(tables.len());
        let mut order = Vec::with_capacity(tables.len());
        for table in tables {
            order.push(table.sheet_name.clone());
            by_sheet.insert(table.sheet_name.clone(), table);
        }
        Self { by_sheet, order }
    }

    /// All registered tables, in declaration order. C5 writes destination
    /// tables in this order.
    pub fn tables(&self) -> Vec<&TableSpec> {
        self.order.iter().filter_map(|name| self.by_sheet.get(name)).collect()
    }

    /// Strict sheet match: the decoded sheet name must equal a registered
    /// `sheet_name` exactly.
    pub fn spec_by_sheet(&self, sheet_name: &str) -> Option<&TableSpec> {
        self.by_sheet.get(sheet_name)
    }
}
