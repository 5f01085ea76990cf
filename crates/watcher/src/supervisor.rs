//! WatchSupervisor - per-source start/stop on top of one shared queue
//!
//! Owns the queue, the delivery client and the status callback shared by
//! every watcher, and at most one running watcher per record kind.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use contracts::{HealthReport, RecordKind, RecordTransport, StatusCallback};
use delivery::DeliveryClient;
use durable_queue::SharedQueue;
use ingestion::{RecordMapper, RecordSchema};
use tracing::{info, instrument};

use crate::error::WatcherError;
use crate::handle::{WatcherHandle, WatcherState};
use crate::source::{SourceWatcher, WatchState};

pub struct WatchSupervisor<T> {
    queue: Arc<SharedQueue>,
    client: Arc<DeliveryClient<T>>,
    status: StatusCallback,
    poll_interval: Duration,
    schemas: HashMap<RecordKind, RecordSchema>,
    handles: BTreeMap<RecordKind, WatcherHandle>,
}

impl<T> WatchSupervisor<T>
where
    T: RecordTransport + Send + Sync + 'static,
{
    pub fn new(
        queue: Arc<SharedQueue>,
        client: Arc<DeliveryClient<T>>,
        status: StatusCallback,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            client,
            status,
            poll_interval,
            schemas: HashMap::new(),
            handles: BTreeMap::new(),
        }
    }

    /// Use `schema` instead of the built-in layout for its kind
    pub fn with_schema(mut self, schema: RecordSchema) -> Self {
        self.schemas.insert(schema.kind(), schema);
        self
    }

    pub fn queue(&self) -> &Arc<SharedQueue> {
        &self.queue
    }

    pub fn client(&self) -> &Arc<DeliveryClient<T>> {
        &self.client
    }

    /// Pre-flight health check
    pub async fn probe(&self) -> HealthReport {
        self.client.probe().await
    }

    /// Start watching `path` for `kind` with a fresh high-water mark.
    ///
    /// # Errors
    /// `AlreadyRunning` when a watcher for `kind` is still running.
    #[instrument(name = "supervisor_start", skip(self, path), fields(path = %path.display()))]
    pub fn start(&mut self, kind: RecordKind, path: PathBuf, reactor_id: i64) -> Result<(), WatcherError> {
        if self.state(kind) == WatcherState::Running {
            return Err(WatcherError::AlreadyRunning { kind });
        }

        let schema = self
            .schemas
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| RecordSchema::builtin(kind));
        let watcher = SourceWatcher::new(
            WatchState::new(path, reactor_id, RecordMapper::new(schema)),
            Arc::clone(&self.queue),
            Arc::clone(&self.client),
            Arc::clone(&self.status),
        );

        // A previously stopped handle is replaced; its task is already exiting
        self.handles
            .insert(kind, WatcherHandle::start(watcher, self.poll_interval));
        info!(%kind, reactor_id, "watcher scheduled");
        Ok(())
    }

    /// Stop the watcher for `kind` and wait for its loop to exit.
    ///
    /// Returns false when no watcher was registered.
    pub async fn stop(&mut self, kind: RecordKind) -> bool {
        match self.handles.remove(&kind) {
            Some(handle) => {
                handle.shutdown().await;
                true
            }
            None => false,
        }
    }

    /// `Idle` for kinds that were never started
    pub fn state(&self, kind: RecordKind) -> WatcherState {
        self.handles
            .get(&kind)
            .map_or(WatcherState::Idle, WatcherHandle::state)
    }

    pub fn running(&self) -> Vec<RecordKind> {
        self.handles
            .values()
            .filter(|h| h.is_running())
            .map(WatcherHandle::kind)
            .collect()
    }

    /// Stop every watcher, then wait for all loops to exit
    #[instrument(name = "supervisor_shutdown", skip(self), fields(watchers = self.handles.len()))]
    pub async fn shutdown(&mut self) {
        let handles = std::mem::take(&mut self.handles);
        for handle in handles.values() {
            handle.stop();
        }
        for (_, handle) in handles {
            handle.join().await;
        }
        info!("all watchers stopped");
    }
}
