//! # Delivery
//!
//! Record delivery module.
//!
//! Responsibilities:
//! - POST one `SourceRecord` to the ingestion endpoint per attempt
//! - Retry with bounded exponential backoff, classify every attempt
//! - Pre-flight health probe
//! - Delivery counters for the run summary

pub mod client;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod transports;

pub use client::DeliveryClient;
pub use contracts::{AttemptOutcome, DeliveryOutcome, HealthReport, RecordTransport};
pub use error::DeliveryError;
pub use metrics::{DeliveryMetrics, DeliverySnapshot};
pub use retry::RetryPolicy;
pub use transports::{HttpTransport, ScriptedTransport};
