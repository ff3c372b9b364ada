use sqlx::{Postgres, Transaction};
use syncd_core::{FileStatus, NormalizedTable, SqlValue, SyncError};

use crate::hash::Fingerprint;

/// Opens a `ProcessedFile` row inside the caller's transaction, stamps its
/// surrogate id onto every row of every normalized table, and bulk-loads
/// each destination table via `COPY ... FROM STDIN`, in the order C1
/// declared them. Returns the `ProcessedFile` id so the caller can populate
/// foreign keys on any child rows it writes afterward.
///
/// `status`/`error_message` are the caller's call: an item with dropped rows
/// still commits (the surviving rows are real data worth keeping) but is
/// recorded as `FileStatus::Failed` with the first coercion error, per spec
/// §3's `ProcessedFile.status`/`error_message` columns. The partial unique
/// index on `(file_hash, file_size_bytes)` only binds `Success` rows, so a
/// `Failed` artifact can be legitimately re-delivered and retried later.
///
/// Write order: (1) `ProcessedFile`, (2) each destination table. Failures
/// bubble as `SyncError::WriteFailure`/`SyncError::ConstraintViolation` and
/// leave the outer transaction for the caller to roll back — no partial
/// rows are ever observable, because nothing here commits.
pub async fn write(
    tx: &mut Transaction<'_, Postgres>,
    ledger_schema: &str,
    file_name: &str,
    source_item_id: &str,
    fp: &Fingerprint,
    tables: &mut [NormalizedTable],
    status: FileStatus,
    error_message: &str,
) -> Result<i64, SyncError> {
    let record_count: i64 = tables.iter().map(|t| t.rows.len() as i64).sum();
    let status_text = match status {
        FileStatus::Success => "Success",
        FileStatus::Failed => "Failed",
    };

    let insert_sql = format!(
        "INSERT INTO {ledger_schema}.processed_file \
         (file_name, source_item_id, file_hash, file_size_bytes, processed_at, status, record_count, error_message) \
         VALUES ($1, $2, $3, $4, now(), $5, $6, $7) RETURNING id"
    );
    let (processed_file_id,): (i64,) = sqlx::query_as(&insert_sql)
        .bind(file_name)
        .bind(source_item_id)
        .bind(&fp.hash_hex)
        .bind(fp.size_bytes)
        .bind(status_text)
        .bind(record_count)
        .bind(error_message)
        .fetch_one(&mut **tx)
        .await?;

    for table in tables.iter_mut() {
        table.stamp_processed_file_id(processed_file_id);
        bulk_load_table(tx, table).await?;
    }

    Ok(processed_file_id)
}

async fn bulk_load_table(
    tx: &mut Transaction<'_, Postgres>,
    table: &NormalizedTable,
) -> Result<(), SyncError> {
    if table.rows.is_empty() {
        return Ok(());
    }

    let mut columns: Vec<&str> = table.spec.columns.iter().map(|c| c.destination_column.as_str()).collect();
    columns.push("processed_file_id");
    let column_list = columns.join(", ");

    let copy_sql = format!(
        "COPY {} ({column_list}) FROM STDIN WITH (FORMAT csv, NULL '')",
        table.spec.qualified_name()
    );

    let mut copy_in = tx
        .copy_in_raw(&copy_sql)
        .await
        .map_err(|e| SyncError::WriteFailure(format!("opening COPY for {}: {e}", table.spec.qualified_name())))?;

    let mut buffer = Vec::new();
    for row in &table.rows {
        let mut fields: Vec<String> = row.values.iter().map(csv_field).collect();
        fields.push(
            row.processed_file_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        );
        buffer.extend_from_slice(fields.join(",").as_bytes());
        buffer.push(b'\n');
    }

    copy_in
        .send(buffer)
        .await
        .map_err(|e| SyncError::WriteFailure(format!("streaming COPY data: {e}")))?;
    copy_in
        .finish()
        .await
        .map_err(SyncError::from)?;
    Ok(())
}

fn csv_field(value: &SqlValue) -> String {
    let raw = match value {
        SqlValue::Text(s) => s.clone(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::BigInt(i) => i.to_string(),
        SqlValue::Numeric(d) => d.to_string(),
        SqlValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        SqlValue::Timestamp(t) => t.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        SqlValue::Boolean(b) => b.to_string(),
        SqlValue::Null => return String::new(),
    };
    if raw.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_field_quotes_commas_and_doubles_quotes() {
        assert_eq!(csv_field(&SqlValue::Text("a,b".into())), "\"a,b\"");
        assert_eq!(csv_field(&SqlValue::Text("a\"b".into())), "\"a\"\"b\"");
        assert_eq!(csv_field(&SqlValue::Null), "");
        assert_eq!(csv_field(&SqlValue::Integer(42)), "42");
    }
}
