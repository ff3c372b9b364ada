/// Error taxonomy for the sync orchestrator.
///
/// Each variant corresponds to a row in spec §7's error-kind table and is
/// handled by exactly one policy in `syncd-sync::consumer::dispatch`:
/// archive-and-ack (the message will not succeed on retry) or
/// rethrow-and-retry (the failure might be transient).
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Fatal at start-up; the process should exit nonzero.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Connectivity probe or Source API call failed. Archived, not retried
    /// in a tight loop.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// The Source reports the delta cursor is no longer valid; the caller
    /// should fall back to a windowed resync and retry the pull.
    #[error("cursor expired, resync required")]
    CursorExpired,

    /// The inbound message's `resource` field didn't match
    /// `sites/{site}/lists/{list}`.
    #[error("unrecognized resource shape: {0}")]
    BadResource(String),

    /// A decoded sheet didn't strictly match its `TableSpec` (C1/C3).
    #[error("schema mismatch for sheet {sheet}: {detail}")]
    SchemaMismatch { sheet: String, detail: String },

    /// The spreadsheet byte stream could not be parsed (C2).
    #[error("decode error: {0}")]
    DecodeError(String),

    /// A single cell failed type coercion (C3). Callers accumulate these
    /// per row rather than aborting the batch.
    #[error("coercion error in {table}.{column}: {detail}")]
    CoerceError {
        table: String,
        column: String,
        detail: String,
    },

    /// The (hash, size) pair was already present in the ledger. Not a true
    /// error — callers treat this as "skip silently".
    #[error("duplicate artifact")]
    DuplicateArtifact,

    /// The bulk writer failed for a reason other than a unique-constraint
    /// race (C5).
    #[error("write failure: {0}")]
    WriteFailure(String),

    /// The unique `(file_hash, file_size_bytes)` constraint rejected a
    /// concurrent duplicate commit.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A per-run deadline elapsed.
    #[error("operation timed out")]
    Timeout,

    /// The run's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// Catch-all for errors that don't need first-class dispatch handling.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SyncError {
    /// Whether this error should be archived-and-acked (true) or
    /// rethrown for the queue's own redelivery/dead-letter policy (false),
    /// per spec §7's "rule of thumb".
    pub fn is_archivable(&self) -> bool {
        matches!(
            self,
            SyncError::SourceUnavailable(_)
                | SyncError::BadResource(_)
                | SyncError::SchemaMismatch { .. }
                | SyncError::DecodeError(_)
        )
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Other(anyhow::anyhow!(err))
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                SyncError::ConstraintViolation(db_err.message().to_string())
            }
            _ => SyncError::WriteFailure(err.to_string()),
        }
    }
}
