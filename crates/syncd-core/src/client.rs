use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SyncError;

/// Metadata returned by `SourceClient::get_list_item`.
#[derive(Debug, Clone)]
pub struct ListItemFields {
    pub process_flag: String,
}

/// Metadata returned by `SourceClient::get_drive_item`.
#[derive(Debug, Clone)]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    pub parent_path: String,
    pub drive_id: String,
}

/// The four Source operations C6 depends on (spec §6). The live HTTP
/// implementation lives in `syncd-io::source_http`; tests use a hand-rolled
/// fake implementing the same trait.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Pulls a delta page since `cursor` (empty string ⇒ mint a fresh
    /// cursor). Returns the new cursor and the changed item ids. Returns
    /// `SyncError::CursorExpired` when the Source signals resync-required.
    async fn pull_items_delta(
        &self,
        site_id: &str,
        list_id: &str,
        cursor: &str,
    ) -> Result<(String, Vec<String>), SyncError>;

    /// Windowed fallback used after `CursorExpired`: items modified at or
    /// after `since`.
    async fn pull_items_modified_since(
        &self,
        site_id: &str,
        list_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>, SyncError>;

    async fn get_list_item(
        &self,
        site_id: &str,
        list_id: &str,
        item_id: &str,
    ) -> Result<ListItemFields, SyncError>;

    async fn get_drive_item(
        &self,
        site_id: &str,
        list_id: &str,
        item_id: &str,
    ) -> Result<DriveItem, SyncError>;

    async fn download(&self, drive_id: &str, item_id: &str) -> Result<Vec<u8>, SyncError>;

    /// One-shot reachability check performed by C7 before dispatch.
    async fn probe(&self) -> Result<(), SyncError>;
}

/// Message receive/ack/continuation-enqueue/poison-archive boundary for the
/// durable inbound queue (spec §6, §4.7). The live Kafka implementation
/// lives in `syncd-io::queue_kafka`.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Serializes and enqueues a continuation payload onto the same topic
    /// the original message arrived on.
    async fn enqueue_continuation(
        &self,
        payload: &crate::payload::ContinuationPayload,
    ) -> Result<(), SyncError>;

    /// Archives a message body to the poison store. The archival body
    /// itself (blob storage wire dialect) is out of scope for this crate;
    /// this method is a thin forwarding hook.
    async fn archive(&self, raw_body: &[u8], reason: &str) -> Result<(), SyncError>;
}

/// Injectable time source so windowed-resync math (`last_processed_at -
/// 10m`) is deterministic in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// `Clock` backed by the real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
