//! # syncd-io
//!
//! Concrete source/sink implementations for the syncd pipeline: the
//! spreadsheet decoder (C2), content-hash dedup ledger lookup (C4), the
//! transactional bulk writer (C5), and the live `SourceClient`/`QueueClient`
//! adapters that sit behind `syncd-core`'s boundary traits.

/// Spreadsheet byte stream → in-memory string tables (C2).
pub mod decode;
/// SHA-256 + length fingerprinting and ledger lookup (C4).
pub mod hash;
/// Kafka-backed `QueueClient` implementation.
pub mod queue_kafka;
/// HTTP `SourceClient` implementation and connectivity probe.
pub mod source_http;
/// Parent-path canonicalization (used by C6, lives here alongside the
/// Source client it's paired with).
pub mod path;
/// Transactional bulk writer (C5).
pub mod writer;

pub use decode::parse;
pub use hash::{fingerprint, Fingerprint};
pub use path::canonicalize_path;
pub use queue_kafka::KafkaQueueClient;
pub use source_http::HttpSourceClient;
pub use writer::write;
