use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use sqlx::{PgPool, Postgres, Transaction};
use syncd_core::{AppConfig, Clock, FileStatus, ProcessingLog, SchemaRegistry, SourceClient, SyncError};
use syncd_io::path::canonicalize_path;
use tracing::{info, warn};

const ACCEPTED_EXTENSIONS: &[&str] = &[".xlsx", ".xls", ".xlsm", ".xlsb"];

/// Outcome of one committed orchestration run.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed { successful: u32, failed: u32 },
    Continuation {
        remaining_item_ids: Vec<String>,
        pending_delta_link: String,
    },
}

/// Per-item result, used internally to drive counters without aborting the
/// run for non-fatal outcomes. `Failed` carries the first row-coercion
/// error message so the caller can thread it onto `ProcessingLog.last_error`.
enum ItemOutcome {
    Succeeded,
    Failed(String),
    Skipped,
}

/// The composition root: an explicit struct holding every collaborator C6
/// needs, built once at start-up (spec §9 REDESIGN FLAGS — no DI container).
pub struct Orchestrator {
    pub registry: Arc<SchemaRegistry>,
    pub source: Arc<dyn SourceClient>,
    pub pool: PgPool,
    pub clock: Arc<dyn Clock>,
    pub config: AppConfig,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        source: Arc<dyn SourceClient>,
        pool: PgPool,
        clock: Arc<dyn Clock>,
        config: AppConfig,
    ) -> Self {
        Self {
            registry,
            source,
            pool,
            clock,
            config,
        }
    }

    /// Pulls a fresh delta page using the stored cursor for
    /// `(site_id, list_id)`, processes up to `batch_size` items inside one
    /// transaction, and commits a new `ProcessingLog` row plus any
    /// destination rows. Returns a `Continuation` if the delta produced more
    /// ids than `batch_size` allows in one commit.
    pub async fn fetch_and_store_delta(&self, batch_size: usize) -> Result<RunOutcome, SyncError> {
        let mut tx = self.pool.begin().await?;

        let prior = self.latest_log(&mut tx).await?;
        let cursor = prior.as_ref().map(|p| p.delta_link.clone()).unwrap_or_default();
        let last_processed_at = prior.as_ref().map(|p| p.last_processed_at).unwrap_or_else(|| self.clock.now());

        let (new_cursor, ids) = match self.source.pull_items_delta(&self.config.site_id, &self.config.list_id, &cursor).await {
            Ok(result) => result,
            Err(SyncError::CursorExpired) => {
                let since = last_processed_at
                    - ChronoDuration::minutes(self.config.resync_window_minutes);
                info!(%since, "cursor expired, falling back to windowed resync");
                let windowed_ids = self
                    .source
                    .pull_items_modified_since(&self.config.site_id, &self.config.list_id, since)
                    .await?;
                let (fresh_cursor, _) = self
                    .source
                    .pull_items_delta(&self.config.site_id, &self.config.list_id, "")
                    .await?;
                (fresh_cursor, windowed_ids)
            }
            Err(other) => return Err(other),
        };

        let (batch, remainder) = split_batch(ids, batch_size);
        let log_id = self.start_log(&mut tx).await?;

        let (successful, failed, last_error) = self.process_batch(&mut tx, &batch).await?;

        if remainder.is_empty() {
            self.finalize_log(&mut tx, log_id, &new_cursor, successful, failed, last_error.as_deref())
                .await?;
            tx.commit().await?;
            Ok(RunOutcome::Completed { successful, failed })
        } else {
            // Continuation: commit what we did, but do not finalize the
            // cursor yet — the tail carries the pending cursor forward.
            self.finalize_log(&mut tx, log_id, &cursor, successful, failed, last_error.as_deref())
                .await?;
            tx.commit().await?;
            Ok(RunOutcome::Continuation {
                remaining_item_ids: remainder,
                pending_delta_link: new_cursor,
            })
        }
    }

    /// Processes a pre-fetched id list (a continuation's tail), bypassing
    /// the delta pull. The cursor is only finalized (written) when
    /// `finalize` is true; otherwise this isn't the continuation's last
    /// chunk, so the previously committed cursor is persisted unchanged
    /// rather than advancing to the pending delta link before the whole
    /// tail has committed.
    pub async fn fetch_and_store_items(
        &self,
        ids: Vec<String>,
        cursor: String,
        finalize: bool,
    ) -> Result<RunOutcome, SyncError> {
        let mut tx = self.pool.begin().await?;

        let prior_cursor = self
            .latest_log(&mut tx)
            .await?
            .map(|p| p.delta_link)
            .unwrap_or_default();

        let log_id = self.start_log(&mut tx).await?;

        let batch_size = self.config.batch_size;
        let (batch, remainder) = split_batch(ids, batch_size);
        let (successful, failed, last_error) = self.process_batch(&mut tx, &batch).await?;

        let committed_cursor = if finalize { cursor.clone() } else { prior_cursor };

        self.finalize_log(&mut tx, log_id, &committed_cursor, successful, failed, last_error.as_deref())
            .await?;
        tx.commit().await?;

        if remainder.is_empty() {
            Ok(RunOutcome::Completed { successful, failed })
        } else {
            Ok(RunOutcome::Continuation {
                remaining_item_ids: remainder,
                pending_delta_link: cursor,
            })
        }
    }

    /// Returns `(successful, failed, first_error_message)` — the first
    /// coercion error observed across the batch, in item order, so the
    /// caller can stamp it onto `ProcessingLog.last_error` (spec §4.6).
    async fn process_batch(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ids: &[String],
    ) -> Result<(u32, u32, Option<String>), SyncError> {
        let mut successful = 0u32;
        let mut failed = 0u32;
        let mut first_error = None;

        for id in ids {
            match self.fetch_and_store_item(tx, id).await {
                Ok(ItemOutcome::Succeeded) => successful += 1,
                Ok(ItemOutcome::Failed(message)) => {
                    failed += 1;
                    if first_error.is_none() {
                        first_error = Some(message);
                    }
                }
                Ok(ItemOutcome::Skipped) => {}
                // Fatal per-item errors (schema mismatch, decode failure,
                // write failure) abort the whole run: the caller's
                // transaction is dropped unfinalized and rolled back.
                Err(err) => return Err(err),
            }
        }

        Ok((successful, failed, first_error))
    }

    async fn fetch_and_store_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: &str,
    ) -> Result<ItemOutcome, SyncError> {
        let fields = self
            .source
            .get_list_item(&self.config.site_id, &self.config.list_id, item_id)
            .await?;
        if !fields.process_flag.eq_ignore_ascii_case("yes") {
            return Ok(ItemOutcome::Skipped);
        }

        let drive_item = self
            .source
            .get_drive_item(&self.config.site_id, &self.config.list_id, item_id)
            .await?;

        let canonical_parent = canonicalize_path(&drive_item.parent_path);
        let canonical_watched = canonicalize_path(&self.config.watched_path);
        if canonical_parent != canonical_watched {
            return Ok(ItemOutcome::Skipped);
        }

        let lower_name = drive_item.name.to_lowercase();
        if !ACCEPTED_EXTENSIONS.iter().any(|ext| lower_name.ends_with(ext)) {
            return Ok(ItemOutcome::Skipped);
        }

        let bytes = self.source.download(&drive_item.drive_id, &drive_item.id).await?;
        let fp = syncd_io::hash::fingerprint(&bytes);

        if syncd_io::hash::seen(&mut **tx, &self.config.ledger_schema, &fp).await? {
            return Ok(ItemOutcome::Skipped);
        }

        let raw_tables = syncd_io::decode::parse(&bytes)?;

        let mut normalized_tables = Vec::with_capacity(raw_tables.len());
        let mut first_error_message = None;

        for (sheet_name, raw_table) in &raw_tables {
            let spec = self.registry.spec_by_sheet(sheet_name).ok_or_else(|| SyncError::SchemaMismatch {
                sheet: sheet_name.clone(),
                detail: "sheet is not registered in the schema catalog".to_string(),
            })?;

            let outcome = syncd_tx::normalize(spec, raw_table)?;
            if !outcome.row_errors.is_empty() {
                if first_error_message.is_none() {
                    first_error_message = outcome.row_errors.first().map(|e| e.to_string());
                }
                warn!(sheet = %sheet_name, errors = outcome.row_errors.len(), "row-level coercion errors");
            }
            normalized_tables.push(outcome.table);
        }

        let (status, error_message) = match &first_error_message {
            Some(message) => (FileStatus::Failed, message.clone()),
            None => (FileStatus::Success, String::new()),
        };

        syncd_io::writer::write(
            tx,
            &self.config.ledger_schema,
            &drive_item.name,
            item_id,
            &fp,
            &mut normalized_tables,
            status,
            &error_message,
        )
        .await?;

        match first_error_message {
            Some(message) => Ok(ItemOutcome::Failed(message)),
            None => Ok(ItemOutcome::Succeeded),
        }
    }

    async fn latest_log(&self, tx: &mut Transaction<'_, Postgres>) -> Result<Option<ProcessingLog>, SyncError> {
        let query = format!(
            "SELECT * FROM {}.processing_log WHERE site_id = $1 AND list_id = $2 ORDER BY id DESC LIMIT 1",
            self.config.ledger_schema
        );
        let row = sqlx::query_as::<_, ProcessingLog>(&query)
            .bind(&self.config.site_id)
            .bind(&self.config.list_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row)
    }

    async fn start_log(&self, tx: &mut Transaction<'_, Postgres>) -> Result<i64, SyncError> {
        let query = format!(
            "INSERT INTO {}.processing_log \
             (site_id, list_id, delta_link, last_processed_at, status, successful_items, failed_items, last_processed_count, last_error, created_at, updated_at) \
             VALUES ($1, $2, '', now(), 'Started', 0, 0, 0, '', now(), now()) RETURNING id",
            self.config.ledger_schema
        );
        let (id,): (i64,) = sqlx::query_as(&query)
            .bind(&self.config.site_id)
            .bind(&self.config.list_id)
            .fetch_one(&mut **tx)
            .await?;
        Ok(id)
    }

    async fn finalize_log(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        log_id: i64,
        delta_link: &str,
        successful: u32,
        failed: u32,
        error: Option<&str>,
    ) -> Result<(), SyncError> {
        let query = format!(
            "UPDATE {}.processing_log SET delta_link = $1, last_processed_at = $2, status = 'Completed', \
             successful_items = $3, failed_items = $4, last_processed_count = $5, last_error = $6, updated_at = now() \
             WHERE id = $7",
            self.config.ledger_schema
        );
        sqlx::query(&query)
            .bind(delta_link)
            .bind(self.clock.now())
            .bind(successful as i32)
            .bind(failed as i32)
            .bind((successful + failed) as i32)
            .bind(error.unwrap_or_default())
            .bind(log_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

/// Splits `ids` at `batch_size`, per spec §4.6 "Batching and continuations".
fn split_batch(mut ids: Vec<String>, batch_size: usize) -> (Vec<String>, Vec<String>) {
    if ids.len() <= batch_size {
        (ids, Vec::new())
    } else {
        let remainder = ids.split_off(batch_size);
        (ids, remainder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_batch_leaves_remainder_when_over_bound() {
        let ids: Vec<String> = (0..4).map(|i| i.to_string()).collect();
        let (batch, remainder) = split_batch(ids, 2);
        assert_eq!(batch, vec!["0", "1"]);
        assert_eq!(remainder, vec!["2", "3"]);
    }

    #[test]
    fn split_batch_keeps_everything_when_under_bound() {
        let ids: Vec<String> = (0..4).map(|i| i.to_string()).collect();
        let (batch, remainder) = split_batch(ids, 10);
        assert_eq!(batch.len(), 4);
        assert!(remainder.is_empty());
    }
}
