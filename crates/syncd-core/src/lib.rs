//! # syncd-core
//!
//! Core traits, domain types, and abstractions for the syncd change-data-capture
//! pipeline. This crate defines the shapes every other crate in the workspace
//! builds against: the ledger/destination data model, the declarative schema
//! registry, the `SourceClient`/`QueueClient` boundary traits, configuration,
//! and the `SyncError` taxonomy.
//!
//! Nothing in this crate performs I/O. Concrete Source/queue/database
//! implementations live in `syncd-io`; the orchestration state machine lives
//! in `syncd-sync`.

/// Concrete production `TableSpec` catalog (the one static list §9 calls for).
pub mod catalog;
/// `SourceClient`/`QueueClient`/`Clock` boundary traits.
pub mod client;
/// Layered file+env configuration, validated at start-up.
pub mod config;
/// `SyncError` taxonomy and the §7 archive-vs-retry policy it encodes.
pub mod error;
/// `ProcessingLog`/`ProcessedFile` ledger entities.
pub mod model;
/// Inbound queue payload shapes (notification envelope, continuation).
pub mod payload;
/// Declarative destination schema: `TableSpec`/`ColumnSpec`/`SchemaRegistry`.
pub mod registry;
/// Raw/normalized in-memory table shapes shared by the decoder and normalizer.
pub mod table;
/// Coerced cell values produced by the normalizer.
pub mod value;

pub use catalog::production_catalog;
pub use client::{Clock, DriveItem, ListItemFields, QueueClient, SourceClient, SystemClock};
pub use config::AppConfig;
pub use error::SyncError;
pub use model::{FileStatus, ProcessedFile, ProcessingLog, RunStatus};
pub use payload::{ChangeEntry, ContinuationPayload, InboundMessage, NotificationEnvelope};
pub use registry::{ColumnSpec, SchemaRegistry, SqlType, TableSpec};
pub use table::{NormalizedRow, NormalizedTable, RawTable};
pub use value::SqlValue;
