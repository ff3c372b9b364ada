use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a single orchestration run. Persisted as text in the
/// `processing_log.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "PascalCase")]
#[serde(rename_all = "PascalCase")]
pub enum RunStatus {
    Started,
    Completed,
    Failed,
}

/// Status of a single ingested artifact. Persisted as text in the
/// `processed_file.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "PascalCase")]
#[serde(rename_all = "PascalCase")]
pub enum FileStatus {
    Success,
    Failed,
}

/// One row per orchestration run, scoped to a single `(site_id, list_id)`.
///
/// Invariant: `last_processed_count == successful_items + failed_items`.
/// Invariant: `delta_link` is non-empty when `status == Completed`, unless
/// the run processed zero items against a never-initialized cursor.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProcessingLog {
    pub id: i64,
    pub site_id: String,
    pub list_id: String,
    pub delta_link: String,
    pub last_processed_at: DateTime<Utc>,
    pub status: RunStatus,
    pub successful_items: i32,
    pub failed_items: i32,
    pub last_processed_count: i32,
    pub last_error: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessingLog {
    /// Enforces the `last_processed_count == successful + failed` invariant
    /// inline rather than trusting whatever the caller stamped on the row.
    pub fn processed_count(&self) -> i32 {
        self.successful_items + self.failed_items
    }
}

/// One row per successfully ingested artifact.
///
/// Invariant: `(file_hash, file_size_bytes)` is unique across `Success` rows
/// — enforced at the database level, not just in application code.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProcessedFile {
    pub id: i64,
    pub file_name: String,
    pub source_item_id: String,
    pub file_hash: String,
    pub file_size_bytes: i64,
    pub processed_at: DateTime<Utc>,
    pub status: FileStatus,
    pub record_count: i32,
    pub error_message: String,
}
