//! Pipeline orchestrator - wires queue, delivery client and watchers.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{StatusCallback, StatusEvent, WatchConfig};
use delivery::{DeliveryClient, HttpTransport, RetryPolicy};
use durable_queue::{QueueStore, SharedQueue};
use observability::PipelineMetricsAggregator;
use tracing::{info, warn};
use watcher::WatchSupervisor;

use super::PipelineStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated configuration with CLI overrides applied
    pub config: WatchConfig,

    /// Clear the queue file instead of loading its backlog
    pub reset_queue: bool,

    /// Run the pre-flight health check before starting watchers
    pub probe: bool,

    /// Stop after this long (None = until shutdown signal)
    pub duration: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves or the configured duration elapses.
    ///
    /// Every watcher is stopped and joined before the stats are returned.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let config = &self.config.config;

        if config.sources.is_empty() {
            anyhow::bail!("No sources configured - nothing to watch");
        }

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Queue is reset before the health check so a failed check leaves it cleared
        let queue = SharedQueue::open(QueueStore::new(&config.queue.path), self.config.reset_queue)
            .with_context(|| format!("Failed to open queue {}", config.queue.path.display()))?;
        let queue = Arc::new(queue);
        let backlog = queue.len().await;
        if backlog > 0 {
            info!(backlog, "Delivering persisted backlog");
        }

        // Delivery client
        let transport =
            HttpTransport::new(&config.endpoint).context("Failed to build HTTP client")?;
        info!(push_url = %transport.push_url(), "Delivery endpoint configured");
        let client = Arc::new(DeliveryClient::new(
            transport,
            RetryPolicy::from_config(&config.retry),
        ));

        if self.config.probe {
            let report = client.probe().await;
            if !report.reachable {
                anyhow::bail!(
                    "Endpoint health check failed: {} (use --skip-probe to start anyway)",
                    report.error.as_deref().unwrap_or("unreachable")
                );
            }
        } else {
            warn!("Pre-flight probe skipped");
        }

        // Status events → log + run summary
        let aggregator = Arc::new(Mutex::new(PipelineMetricsAggregator::new()));
        let status = status_logger(Arc::clone(&aggregator));

        let mut supervisor = WatchSupervisor::new(
            Arc::clone(&queue),
            Arc::clone(&client),
            status,
            Duration::from_millis(config.watch.poll_interval_ms),
        );
        for source in &config.sources {
            let schema = config_loader::ConfigLoader::schema_for(config, source.kind)?;
            supervisor = supervisor.with_schema(schema);
        }
        for source in &config.sources {
            supervisor.start(source.kind, source.path.clone(), config.reactor_id_for(source))?;
        }

        info!(
            sources = config.sources.len(),
            poll_interval_ms = config.watch.poll_interval_ms,
            "Watchers running"
        );

        match self.config.duration {
            Some(duration) => {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {
                        info!(duration_secs = duration.as_secs(), "Run duration reached");
                    }
                    _ = shutdown => {
                        warn!("Received shutdown signal, stopping watchers...");
                    }
                }
            }
            None => {
                shutdown.await;
                warn!("Received shutdown signal, stopping watchers...");
            }
        }

        supervisor.shutdown().await;
        if let Err(e) = queue.persist().await {
            warn!(error = %e, "Final queue save failed");
        }

        let summary = aggregator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .summary();

        Ok(PipelineStats {
            duration: start_time.elapsed(),
            sources: config.sources.len(),
            pending: queue.len().await,
            queue_path: config.queue.path.clone(),
            delivery: client.metrics().snapshot(),
            summary,
        })
    }
}

/// Log every status line and feed the run summary
fn status_logger(aggregator: Arc<Mutex<PipelineMetricsAggregator>>) -> StatusCallback {
    Arc::new(move |event: StatusEvent| {
        if event.is_error() {
            warn!(kind = %event.kind(), "{}", event);
        } else {
            info!(kind = %event.kind(), "{}", event);
        }
        aggregator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(&event);
    })
}
