//! Request telemetry
//!
//! Durable append-only log of query outcomes plus a feedback table keyed by
//! request id. One row is written per orchestrator invocation, success or
//! failure.

mod entry;
mod store;

pub use entry::RequestLogEntry;
pub use store::{LoggedRequest, TelemetryStore};
