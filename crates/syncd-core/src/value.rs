use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

/// A single coerced cell value, typed to the destination column's SQL type
/// family. Produced by `syncd-tx::normalize` and consumed by
/// `syncd-io::writer`.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Integer(i32),
    BigInt(i64),
    Numeric(Decimal),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Boolean(bool),
    Null,
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}
