//! # syncd-sync
//!
//! The orchestrator: the sync processor (C6) that drives the delta cursor,
//! fetches and writes individual items inside one transaction per run, and
//! the notification consumer (C7) that dispatches inbound queue messages to
//! it, archiving poison messages and re-enqueuing continuations.
//!
//! Everything else in the workspace is a collaborator this crate composes;
//! nothing downstream of it calls back in.

/// C7: queue-message dispatch, poison archival, continuation re-enqueue.
pub mod consumer;
/// C6: the `Orchestrator` state machine.
pub mod processor;

pub use consumer::{dispatch, DispatchOutcome};
pub use processor::{Orchestrator, RunOutcome};
