//! RecordTransport trait - Delivery Client network interface
//!
//! Abstracts one POST of a record and one health GET, so the retry policy
//! and the watchers can run against an in-process fake.

use crate::{AttemptOutcome, HealthReport, SourceRecord};

/// Record transport trait
///
/// Implementations perform exactly one network exchange per call and never
/// retry; retrying is the Delivery Client's job.
#[trait_variant::make(RecordTransport: Send)]
pub trait LocalRecordTransport {
    /// Endpoint description (used for logging)
    fn endpoint(&self) -> &str;

    /// Issue a single push of `record`
    async fn push(&self, record: &SourceRecord) -> AttemptOutcome;

    /// Issue a single health check
    async fn health(&self) -> HealthReport;
}
