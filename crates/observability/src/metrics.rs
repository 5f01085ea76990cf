//! Pipeline metrics
//!
//! Prometheus helpers called from the delivery and watcher crates, plus an
//! in-memory aggregator fed by status events for the end-of-run summary.

use std::collections::BTreeMap;

use contracts::{AttemptOutcome, RecordKind, StatusEvent};
use metrics::{counter, gauge, histogram};

/// Rows mapped and appended to the queue
pub fn record_rows_queued(kind: RecordKind, count: usize) {
    counter!("reactor_watch_rows_queued_total", "kind" => kind.wire_key()).increment(count as u64);
}

/// Rows dropped because of an invalid date/time
pub fn record_rows_rejected(kind: RecordKind, count: usize) {
    counter!("reactor_watch_rows_rejected_total", "kind" => kind.wire_key())
        .increment(count as u64);
}

/// One HTTP attempt and how it ended
pub fn record_delivery_attempt(kind: RecordKind, outcome: &AttemptOutcome) {
    let result = match outcome {
        AttemptOutcome::Delivered { .. } => "delivered",
        AttemptOutcome::Rejected { .. } => "rejected",
        AttemptOutcome::Unreachable { .. } => "unreachable",
    };
    counter!(
        "reactor_watch_delivery_attempts_total",
        "kind" => kind.wire_key(),
        "result" => result
    )
    .increment(1);
}

/// Final result for one record after all retries
pub fn record_delivery_result(kind: RecordKind, delivered: bool) {
    let status = if delivered { "delivered" } else { "failed" };
    counter!(
        "reactor_watch_records_total",
        "kind" => kind.wire_key(),
        "status" => status
    )
    .increment(1);
}

pub fn record_queue_depth(depth: usize) {
    gauge!("reactor_watch_queue_depth").set(depth as f64);
}

pub fn record_drain_duration_ms(kind: RecordKind, millis: f64) {
    histogram!("reactor_watch_drain_duration_ms", "kind" => kind.wire_key()).record(millis);
}

pub fn record_probe(reachable: bool) {
    gauge!("reactor_watch_endpoint_up").set(if reachable { 1.0 } else { 0.0 });
}

/// Error events per kind
pub fn record_status_event(event: &StatusEvent) {
    let label = match event {
        StatusEvent::SourceError { .. } => "source",
        StatusEvent::PersistenceError { .. } => "persistence",
        _ => return,
    };
    counter!(
        "reactor_watch_errors_total",
        "kind" => event.kind().wire_key(),
        "error" => label
    )
    .increment(1);
}

/// Aggregates status events in memory for the run summary
#[derive(Debug, Clone, Default)]
pub struct PipelineMetricsAggregator {
    pub rows_queued: u64,
    pub rows_skipped: u64,
    pub delivered: u64,
    pub source_errors: u64,
    pub persistence_errors: u64,
    /// Pending count reported after each drain pass
    pub pending_stats: RunningStats,
    /// Last pending count reported
    pub last_pending: usize,
    pub per_kind_queued: BTreeMap<RecordKind, u64>,
}

impl PipelineMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, event: &StatusEvent) {
        match event {
            StatusEvent::Queued {
                kind,
                queued,
                skipped,
                ..
            } => {
                self.rows_queued += *queued as u64;
                self.rows_skipped += *skipped as u64;
                *self.per_kind_queued.entry(*kind).or_insert(0) += *queued as u64;
            }
            StatusEvent::Delivered { count, .. } => self.delivered += *count as u64,
            StatusEvent::Pending { count, .. } => {
                self.pending_stats.push(*count as f64);
                self.last_pending = *count;
            }
            StatusEvent::QueueCleared { .. } => {
                self.pending_stats.push(0.0);
                self.last_pending = 0;
            }
            StatusEvent::SourceError { .. } => self.source_errors += 1,
            StatusEvent::PersistenceError { .. } => self.persistence_errors += 1,
            StatusEvent::Started { .. } | StatusEvent::Stopped { .. } => {}
        }
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            rows_queued: self.rows_queued,
            rows_skipped: self.rows_skipped,
            delivered: self.delivered,
            source_errors: self.source_errors,
            persistence_errors: self.persistence_errors,
            pending: StatsSummary::from(&self.pending_stats),
            per_kind_queued: self.per_kind_queued.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Summary of a run
#[derive(Debug, Clone, Default)]
pub struct PipelineSummary {
    pub rows_queued: u64,
    pub rows_skipped: u64,
    pub delivered: u64,
    pub source_errors: u64,
    pub persistence_errors: u64,
    pub pending: StatsSummary,
    pub per_kind_queued: BTreeMap<RecordKind, u64>,
}

impl std::fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Pipeline Summary ===")?;
        writeln!(f, "Rows queued: {}", self.rows_queued)?;
        writeln!(f, "Rows skipped (invalid date/time): {}", self.rows_skipped)?;
        writeln!(f, "Records delivered: {}", self.delivered)?;
        writeln!(
            f,
            "Errors: {} source, {} persistence",
            self.source_errors, self.persistence_errors
        )?;
        writeln!(f, "Pending after drain: {}", self.pending)?;

        if !self.per_kind_queued.is_empty() {
            writeln!(f, "Queued per source:")?;
            for (kind, count) in &self.per_kind_queued {
                writeln!(f, "  {}: {}", kind.label(), count)?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.0}, max={:.0}, mean={:.1} (n={})",
                self.min, self.max, self.mean, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = PipelineMetricsAggregator::new();

        aggregator.update(&StatusEvent::Queued {
            kind: RecordKind::Gas,
            new_rows: 4,
            queued: 3,
            skipped: 1,
        });
        aggregator.update(&StatusEvent::Delivered {
            kind: RecordKind::Gas,
            count: 2,
        });
        aggregator.update(&StatusEvent::Pending {
            kind: RecordKind::Gas,
            count: 1,
        });
        aggregator.update(&StatusEvent::SourceError {
            kind: RecordKind::Dilution,
            message: "File not found: d.csv".to_string(),
        });

        assert_eq!(aggregator.rows_queued, 3);
        assert_eq!(aggregator.rows_skipped, 1);
        assert_eq!(aggregator.delivered, 2);
        assert_eq!(aggregator.source_errors, 1);
        assert_eq!(aggregator.last_pending, 1);
        assert_eq!(aggregator.per_kind_queued.get(&RecordKind::Gas), Some(&3));
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = PipelineMetricsAggregator::new();
        aggregator.update(&StatusEvent::Queued {
            kind: RecordKind::LevelControl,
            new_rows: 5,
            queued: 5,
            skipped: 0,
        });
        aggregator.update(&StatusEvent::QueueCleared {
            kind: RecordKind::LevelControl,
        });

        let output = aggregator.summary().to_string();
        assert!(output.contains("Rows queued: 5"));
        assert!(output.contains("Level: 5"));
        assert!(output.contains("n=1"));
    }

    #[test]
    fn test_helpers_without_recorder() {
        // No recorder installed: calls are no-ops
        record_rows_queued(RecordKind::Gas, 2);
        record_delivery_attempt(
            RecordKind::Gas,
            &AttemptOutcome::Unreachable {
                cause: "timeout".to_string(),
            },
        );
        record_queue_depth(7);
    }
}
