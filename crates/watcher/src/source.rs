//! SourceWatcher - one poll / append / drain cycle

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use contracts::{RecordKind, RecordTransport, StatusCallback, StatusEvent};
use delivery::DeliveryClient;
use durable_queue::SharedQueue;
use ingestion::{read_table, IngestionError, RecordMapper};
use tracing::{debug, info, instrument, warn};

/// Per-source state, owned by exactly one watcher
#[derive(Debug, Clone)]
pub struct WatchState {
    path: PathBuf,
    reactor_id: i64,
    mapper: RecordMapper,
    /// Source rows already processed
    high_water_mark: usize,
}

impl WatchState {
    pub fn new(path: impl Into<PathBuf>, reactor_id: i64, mapper: RecordMapper) -> Self {
        Self {
            path: path.into(),
            reactor_id,
            mapper,
            high_water_mark: 0,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.mapper.kind()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reactor_id(&self) -> i64 {
        self.reactor_id
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }
}

/// Rows picked up by one append step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendReport {
    /// Rows beyond the previous mark
    pub new_rows: usize,
    /// Rows mapped and appended
    pub queued: usize,
    /// Rows dropped for an invalid date/time
    pub skipped: usize,
    /// Queue length after the append
    pub queue_len: usize,
}

/// Result of one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub attempted: usize,
    pub delivered: usize,
    /// Records left in the queue
    pub pending: usize,
}

/// What one full cycle did
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// `None` when the source could not be read
    pub append: Option<AppendReport>,
    /// `None` when the drain was skipped
    pub drain: Option<DrainReport>,
}

/// Watches one source file and feeds the shared queue
pub struct SourceWatcher<T> {
    state: WatchState,
    queue: Arc<SharedQueue>,
    client: Arc<DeliveryClient<T>>,
    status: StatusCallback,
}

impl<T: RecordTransport + Sync> SourceWatcher<T> {
    pub fn new(
        state: WatchState,
        queue: Arc<SharedQueue>,
        client: Arc<DeliveryClient<T>>,
        status: StatusCallback,
    ) -> Self {
        Self {
            state,
            queue,
            client,
            status,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.state.kind()
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    pub(crate) fn emit(&self, event: StatusEvent) {
        observability::record_status_event(&event);
        (self.status)(event);
    }

    /// One cycle: append new rows, then drain.
    ///
    /// An unreadable source is reported and the cycle ends there; the next
    /// cycle tries again.
    #[instrument(
        name = "watcher_poll_once",
        skip(self),
        fields(kind = %self.kind(), mark = self.state.high_water_mark)
    )]
    pub async fn poll_once(&mut self) -> CycleReport {
        let append = match self.append_new_rows().await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "source unreadable");
                self.emit(StatusEvent::SourceError {
                    kind: self.kind(),
                    message: e.to_string(),
                });
                return CycleReport::default();
            }
        };

        CycleReport {
            append: Some(append),
            drain: self.drain().await,
        }
    }

    /// Read the source and queue rows beyond the high-water mark.
    ///
    /// The mark advances to the current row count even when some rows were
    /// rejected or the queue could not be saved (records stay queued in
    /// memory and reach disk on the next save).
    ///
    /// # Errors
    /// The source file cannot be read or parsed.
    pub async fn append_new_rows(&mut self) -> Result<AppendReport, IngestionError> {
        let kind = self.kind();
        let table = read_table(&self.state.path)?;
        let row_count = table.row_count();
        let mark = self.state.high_water_mark;

        if row_count < mark {
            warn!(rows = row_count, mark, "source shrank below the high-water mark, keeping mark");
            return Ok(AppendReport {
                queue_len: self.queue.len().await,
                ..Default::default()
            });
        }
        if row_count == mark {
            return Ok(AppendReport {
                queue_len: self.queue.len().await,
                ..Default::default()
            });
        }

        let mut records = Vec::with_capacity(row_count - mark);
        let mut skipped = 0;
        for row in table.rows_from(mark) {
            match self.state.mapper.map_row(row, self.state.reactor_id) {
                Ok(record) => records.push(record),
                Err(rejected) => {
                    skipped += 1;
                    warn!(row = row.index() + 1, error = %rejected, "skipping row");
                }
            }
        }

        let new_rows = row_count - mark;
        let queued = records.len();
        self.state.high_water_mark = row_count;

        let queue_len = match self.queue.append(records).await {
            Ok(len) => len,
            Err(e) => {
                warn!(error = %e, "queue save failed after append");
                self.emit(StatusEvent::PersistenceError {
                    kind,
                    message: e.to_string(),
                });
                self.queue.len().await
            }
        };

        observability::record_rows_queued(kind, queued);
        if skipped > 0 {
            observability::record_rows_rejected(kind, skipped);
        }
        observability::record_queue_depth(queue_len);
        info!(new_rows, queued, skipped, mark = row_count, "new rows queued");
        self.emit(StatusEvent::Queued {
            kind,
            new_rows,
            queued,
            skipped,
        });

        Ok(AppendReport {
            new_rows,
            queued,
            skipped,
            queue_len,
        })
    }

    /// Attempt delivery of every queued record, oldest first.
    ///
    /// Delivered records are removed, the rest keep their order. Returns
    /// `None` when another watcher is already draining.
    #[instrument(name = "watcher_drain", skip(self), fields(kind = %self.kind()))]
    pub async fn drain(&self) -> Option<DrainReport> {
        let Some(_gate) = self.queue.try_begin_drain() else {
            debug!("drain already in progress");
            return None;
        };

        let snapshot = self.queue.snapshot().await;
        if snapshot.is_empty() {
            return Some(DrainReport::default());
        }

        let kind = self.kind();
        let started = Instant::now();
        let mut delivered = Vec::new();
        for entry in &snapshot {
            if self.client.send(&entry.record).await.is_delivered() {
                delivered.push(entry.seq);
            }
        }

        let pending = match self.queue.remove_delivered(&delivered).await {
            Ok(len) => len,
            Err(e) => {
                warn!(error = %e, "queue save failed after drain");
                self.emit(StatusEvent::PersistenceError {
                    kind,
                    message: e.to_string(),
                });
                self.queue.len().await
            }
        };

        observability::record_queue_depth(pending);
        observability::record_drain_duration_ms(kind, started.elapsed().as_secs_f64() * 1000.0);
        info!(
            attempted = snapshot.len(),
            delivered = delivered.len(),
            pending,
            "drain finished"
        );

        if !delivered.is_empty() {
            self.emit(StatusEvent::Delivered {
                kind,
                count: delivered.len(),
            });
        }
        if pending > 0 {
            self.emit(StatusEvent::Pending {
                kind,
                count: pending,
            });
        } else {
            self.emit(StatusEvent::QueueCleared { kind });
        }

        Some(DrainReport {
            attempted: snapshot.len(),
            delivered: delivered.len(),
            pending,
        })
    }
}
