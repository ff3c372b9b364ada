use std::sync::OnceLock;

use regex::Regex;
use syncd_core::{ContinuationPayload, InboundMessage, NotificationEnvelope, QueueClient, SyncError};
use tracing::{info, warn};

use crate::processor::{Orchestrator, RunOutcome};

/// `sites/{site}/lists/{list}` — the only recognized `resource` shape on a
/// notification's change entries (spec §6).
fn resource_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^sites/[^/]+/lists/[^/]+$").expect("resource pattern is a valid regex"))
}

/// What happened to one inbound message, for the consumer loop's own
/// bookkeeping/metrics; both variants ack the message to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Succeeded,
    Archived,
}

/// C7: recognizes a notification envelope or continuation payload, probes
/// Source connectivity, dispatches to the orchestrator, archives poison
/// messages, and re-enqueues continuations. Unhandled (non-archivable)
/// errors are rethrown so the queue's own redelivery/dead-letter policy
/// applies — per spec §4.7/§7.
pub async fn dispatch(
    raw_body: &[u8],
    orchestrator: &Orchestrator,
    queue: &dyn QueueClient,
) -> Result<DispatchOutcome, SyncError> {
    if let Err(err) = orchestrator.source.probe().await {
        warn!(error = %err, "source connectivity probe failed, archiving message");
        queue.archive(raw_body, &format!("source unavailable: {err}")).await?;
        return Ok(DispatchOutcome::Archived);
    }

    let message = InboundMessage::parse(raw_body);

    let run_result = match message {
        InboundMessage::Notification(envelope) => match validate_envelope(&envelope) {
            Ok(()) if envelope.value.is_empty() => {
                info!("empty notification envelope, no work to do");
                return Ok(DispatchOutcome::Succeeded);
            }
            Ok(()) => orchestrator.fetch_and_store_delta(orchestrator.config.batch_size).await,
            Err(bad_resource) => {
                warn!(error = %bad_resource, "dropping notification with unrecognized resource shape");
                return Ok(DispatchOutcome::Succeeded);
            }
        },
        InboundMessage::Continuation(continuation) => {
            let finalize = continuation.item_ids.len() <= orchestrator.config.batch_size;
            orchestrator
                .fetch_and_store_items(continuation.item_ids, continuation.delta_link, finalize)
                .await
        }
        InboundMessage::Unrecognized => {
            info!("message body matched neither recognized shape, dropping");
            return Ok(DispatchOutcome::Succeeded);
        }
    };

    match run_result {
        Ok(RunOutcome::Completed { successful, failed }) => {
            info!(successful, failed, "run committed");
            Ok(DispatchOutcome::Succeeded)
        }
        Ok(RunOutcome::Continuation {
            remaining_item_ids,
            pending_delta_link,
        }) => {
            let remaining = remaining_item_ids.len();
            let payload = ContinuationPayload {
                item_ids: remaining_item_ids,
                delta_link: pending_delta_link,
            };
            queue.enqueue_continuation(&payload).await?;
            info!(remaining, "enqueued continuation for remainder of batch");
            Ok(DispatchOutcome::Succeeded)
        }
        Err(err) if err.is_archivable() => {
            warn!(error = %err, "archiving message after recognized processing failure");
            queue.archive(raw_body, &err.to_string()).await?;
            Ok(DispatchOutcome::Archived)
        }
        // WriteFailure/ConstraintViolation/Timeout/Cancelled: might recover
        // on redelivery. Rethrow for the broker's own retry policy.
        Err(err) => Err(err),
    }
}

/// Rejects a notification whose entries don't all match the
/// `sites/{site}/lists/{list}` resource shape.
fn validate_envelope(envelope: &NotificationEnvelope) -> Result<(), SyncError> {
    for entry in &envelope.value {
        if !resource_pattern().is_match(&entry.resource) {
            return Err(SyncError::BadResource(entry.resource.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::{Arc, Mutex};
    use syncd_core::{Clock, DriveItem, ListItemFields, SchemaRegistry, SourceClient};

    #[derive(Default)]
    struct FakeQueue {
        archived: Mutex<Vec<(Vec<u8>, String)>>,
        enqueued: Mutex<Vec<ContinuationPayload>>,
    }

    #[async_trait]
    impl QueueClient for FakeQueue {
        async fn enqueue_continuation(&self, payload: &ContinuationPayload) -> Result<(), SyncError> {
            self.enqueued.lock().unwrap().push(payload.clone());
            Ok(())
        }

        async fn archive(&self, raw_body: &[u8], reason: &str) -> Result<(), SyncError> {
            self.archived.lock().unwrap().push((raw_body.to_vec(), reason.to_string()));
            Ok(())
        }
    }

    struct UnreachableSource;

    #[async_trait]
    impl SourceClient for UnreachableSource {
        async fn pull_items_delta(&self, _: &str, _: &str, _: &str) -> Result<(String, Vec<String>), SyncError> {
            unreachable!("probe fails before any delta pull")
        }
        async fn pull_items_modified_since(&self, _: &str, _: &str, _: DateTime<Utc>) -> Result<Vec<String>, SyncError> {
            unreachable!()
        }
        async fn get_list_item(&self, _: &str, _: &str, _: &str) -> Result<ListItemFields, SyncError> {
            unreachable!()
        }
        async fn get_drive_item(&self, _: &str, _: &str, _: &str) -> Result<DriveItem, SyncError> {
            unreachable!()
        }
        async fn download(&self, _: &str, _: &str) -> Result<Vec<u8>, SyncError> {
            unreachable!()
        }
        async fn probe(&self) -> Result<(), SyncError> {
            Err(SyncError::SourceUnavailable("connection refused".into()))
        }
    }

    struct ReachableSource;

    #[async_trait]
    impl SourceClient for ReachableSource {
        async fn pull_items_delta(&self, _: &str, _: &str, _: &str) -> Result<(String, Vec<String>), SyncError> {
            unreachable!("an empty envelope never pulls a delta")
        }
        async fn pull_items_modified_since(&self, _: &str, _: &str, _: DateTime<Utc>) -> Result<Vec<String>, SyncError> {
            unreachable!()
        }
        async fn get_list_item(&self, _: &str, _: &str, _: &str) -> Result<ListItemFields, SyncError> {
            unreachable!()
        }
        async fn get_drive_item(&self, _: &str, _: &str, _: &str) -> Result<DriveItem, SyncError> {
            unreachable!()
        }
        async fn download(&self, _: &str, _: &str) -> Result<Vec<u8>, SyncError> {
            unreachable!()
        }
        async fn probe(&self) -> Result<(), SyncError> {
            Ok(())
        }
    }

    struct FixedClock(DateTime<Utc>);
    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn sample_config() -> syncd_core::AppConfig {
        syncd_core::AppConfig {
            site_id: "s".into(),
            list_id: "l".into(),
            watched_path: "/docs/watched".into(),
            batch_size: 200,
            resync_window_minutes: 10,
            ledger_schema: "edges_raw".into(),
            db_connection: "postgres://localhost/db".into(),
            queue_connection: "kafka://localhost:9092".into(),
            source_credentials: "opaque".into(),
            source_base_url: "https://graph.example.com/v1.0".into(),
            worker_concurrency: 8,
            run_timeout_secs: 120,
        }
    }

    #[test]
    fn resource_pattern_matches_expected_shape() {
        assert!(resource_pattern().is_match("sites/x/lists/y"));
        assert!(!resource_pattern().is_match("sites/x"));
        assert!(!resource_pattern().is_match("lists/y"));
    }

    #[test]
    fn validate_envelope_rejects_bad_resource() {
        let envelope = NotificationEnvelope {
            value: vec![syncd_core::ChangeEntry {
                subscription_id: "s1".into(),
                resource: "not-a-resource".into(),
                change_type: "updated".into(),
                client_state: "cs".into(),
            }],
        };
        assert!(matches!(validate_envelope(&envelope), Err(SyncError::BadResource(_))));
    }

    #[tokio::test]
    async fn unreachable_source_archives_and_acks() {
        // Exercises the probe-then-archive branch without needing a live
        // database: the orchestrator's pool is never touched because the
        // probe fails before any transaction opens.
        let orchestrator = Orchestrator {
            registry: Arc::new(SchemaRegistry::new(vec![])),
            source: Arc::new(UnreachableSource),
            pool: sqlx::PgPool::connect_lazy("postgres://localhost/nonexistent")
                .expect("lazy pool construction never touches the network"),
            clock: Arc::new(FixedClock(Utc::now())),
            config: sample_config(),
        };
        let queue = FakeQueue::default();

        let body = br#"{"value":[{"subscriptionId":"s1","resource":"sites/x/lists/y","changeType":"updated","clientState":"cs"}]}"#;
        let outcome = dispatch(body, &orchestrator, &queue).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Archived);
        assert_eq!(queue.archived.lock().unwrap().len(), 1);
        assert!(queue.enqueued.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn handshake_only_envelope_is_a_succeeded_no_op() {
        // S1: `{"value":[]}` against a reachable Source does no work and
        // succeeds without ever touching the orchestrator's database pool.
        let orchestrator = Orchestrator {
            registry: Arc::new(SchemaRegistry::new(vec![])),
            source: Arc::new(ReachableSource),
            pool: sqlx::PgPool::connect_lazy("postgres://localhost/nonexistent")
                .expect("lazy pool construction never touches the network"),
            clock: Arc::new(FixedClock(Utc::now())),
            config: sample_config(),
        };
        let queue = FakeQueue::default();

        let outcome = dispatch(br#"{"value":[]}"#, &orchestrator, &queue).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Succeeded);
        assert!(queue.archived.lock().unwrap().is_empty());
        assert!(queue.enqueued.lock().unwrap().is_empty());
    }
}
