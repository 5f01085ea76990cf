//! DeliveryClient - bounded retry around a `RecordTransport`

use std::sync::Arc;

use contracts::{AttemptOutcome, DeliveryOutcome, HealthReport, RecordTransport, SourceRecord};
use tracing::{debug, info, instrument, warn};

use crate::metrics::DeliveryMetrics;
use crate::retry::RetryPolicy;

/// Sends records with retries and reports one outcome per record
pub struct DeliveryClient<T> {
    transport: T,
    policy: RetryPolicy,
    metrics: Arc<DeliveryMetrics>,
}

impl<T: RecordTransport> DeliveryClient<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            metrics: Arc::new(DeliveryMetrics::new()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn metrics(&self) -> &Arc<DeliveryMetrics> {
        &self.metrics
    }

    /// Deliver `record`, retrying until HTTP 200 or attempts run out.
    ///
    /// Non-200 responses and transport failures are retried alike. Waits
    /// happen only between attempts.
    #[instrument(
        name = "delivery_send",
        skip_all,
        fields(kind = %record.kind(), endpoint = %self.transport.endpoint())
    )]
    pub async fn send(&self, record: &SourceRecord) -> DeliveryOutcome {
        let kind = record.kind();
        let mut attempt = 1;

        loop {
            self.metrics.inc_attempts();
            let outcome = self.transport.push(record).await;
            observability::record_delivery_attempt(kind, &outcome);

            match &outcome {
                AttemptOutcome::Delivered { message } => {
                    self.metrics.inc_delivered();
                    observability::record_delivery_result(kind, true);
                    info!(attempt, message = message.as_deref().unwrap_or(""), "record delivered");
                    return DeliveryOutcome::Delivered {
                        attempts: attempt,
                        message: message.clone(),
                    };
                }
                AttemptOutcome::Rejected { status, body } => {
                    self.metrics.inc_rejected();
                    warn!(attempt, status, body = %body, "server rejected record");
                }
                AttemptOutcome::Unreachable { cause } => {
                    self.metrics.inc_unreachable();
                    warn!(attempt, cause = %cause, "endpoint unreachable");
                }
            }

            match self.policy.delay_after(attempt) {
                Some(delay) => {
                    debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    self.metrics.inc_failed();
                    observability::record_delivery_result(kind, false);
                    warn!(attempts = attempt, last = %outcome, "delivery failed, record stays queued");
                    return DeliveryOutcome::Failed {
                        attempts: attempt,
                        last: outcome,
                    };
                }
            }
        }
    }

    /// Single health check, no retry
    #[instrument(name = "delivery_probe", skip(self))]
    pub async fn probe(&self) -> HealthReport {
        let report = self.transport.health().await;
        observability::record_probe(report.reachable);
        if report.reachable {
            info!(
                message = report.message.as_deref().unwrap_or(""),
                version = report.version.as_deref().unwrap_or(""),
                "endpoint reachable"
            );
        } else {
            warn!(error = report.error.as_deref().unwrap_or(""), "endpoint unreachable");
        }
        report
    }
}
