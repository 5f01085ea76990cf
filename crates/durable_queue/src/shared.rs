//! SharedQueue - one lock-guarded queue for all watchers
//!
//! Every mutation happens under the same lock and is followed by a save of
//! the whole queue, so concurrent watchers never overwrite each other's
//! appends or resurrect delivered records. Entries carry an in-memory
//! sequence number so a drain removes exactly what it delivered even if
//! other watchers appended meanwhile.
//!
//! Saves run on the blocking pool. The state lock is held until the write
//! finishes, so snapshots reach disk in mutation order.

use std::collections::HashSet;

use contracts::SourceRecord;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

use crate::error::{QueueError, Result};
use crate::store::QueueStore;

/// A queued record with its in-memory identity
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub seq: u64,
    pub record: SourceRecord,
}

#[derive(Debug, Default)]
struct QueueState {
    entries: Vec<QueueEntry>,
    next_seq: u64,
}

impl QueueState {
    fn push(&mut self, record: SourceRecord) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(QueueEntry { seq, record });
    }

    fn records(&self) -> Vec<SourceRecord> {
        self.entries.iter().map(|e| e.record.clone()).collect()
    }
}

/// Held while a drain pass runs; dropping it lets the next drain start
pub struct DrainGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

/// Process-wide pending queue
#[derive(Debug)]
pub struct SharedQueue {
    store: QueueStore,
    state: Mutex<QueueState>,
    drain_gate: Mutex<()>,
}

impl SharedQueue {
    /// Empty queue backed by `store`; the file is not touched
    pub fn new(store: QueueStore) -> Self {
        Self {
            store,
            state: Mutex::new(QueueState::default()),
            drain_gate: Mutex::new(()),
        }
    }

    /// Open the queue at process start.
    ///
    /// With `reset` the persisted snapshot is cleared and the queue starts
    /// empty; otherwise the persisted backlog is loaded.
    #[instrument(name = "shared_queue_open", skip(store), fields(path = %store.path().display()))]
    pub fn open(store: QueueStore, reset: bool) -> Result<Self> {
        let mut state = QueueState::default();
        if reset {
            store.reset()?;
            info!("queue reset on start");
        } else {
            let backlog = store.load();
            info!(backlog = backlog.len(), "queue backlog loaded");
            for record in backlog {
                state.push(record);
            }
        }

        Ok(Self {
            store,
            state: Mutex::new(state),
            drain_gate: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    /// Append `records` in order and persist.
    ///
    /// On a save failure the records stay queued in memory and are written
    /// by the next successful save. Returns the queue length.
    pub async fn append(&self, records: Vec<SourceRecord>) -> Result<usize> {
        let mut state = self.state.lock().await;
        if records.is_empty() {
            return Ok(state.entries.len());
        }

        let added = records.len();
        for record in records {
            state.push(record);
        }
        let len = state.entries.len();
        debug!(added, len, "records appended");

        self.save_blocking(state.records()).await?;
        Ok(len)
    }

    /// Consistent copy of the queue in delivery order
    pub async fn snapshot(&self) -> Vec<QueueEntry> {
        self.state.lock().await.entries.clone()
    }

    /// Remove the entries whose `seq` is listed, keep the rest in their
    /// original order, and persist. Returns the remaining length.
    pub async fn remove_delivered(&self, delivered: &[u64]) -> Result<usize> {
        let mut state = self.state.lock().await;
        if !delivered.is_empty() {
            let delivered: HashSet<u64> = delivered.iter().copied().collect();
            state.entries.retain(|e| !delivered.contains(&e.seq));
        }
        let len = state.entries.len();

        self.save_blocking(state.records()).await?;
        Ok(len)
    }

    /// Write the current queue to disk
    pub async fn persist(&self) -> Result<()> {
        let state = self.state.lock().await;
        self.save_blocking(state.records()).await
    }

    async fn save_blocking(&self, records: Vec<SourceRecord>) -> Result<()> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.save(&records))
            .await
            .map_err(|e| QueueError::io(self.store.path(), std::io::Error::other(e)))?
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Records currently queued, in order
    pub async fn records(&self) -> Vec<SourceRecord> {
        self.state.lock().await.records()
    }

    /// Claim the right to drain.
    ///
    /// Returns `None` while another drain pass holds the gate.
    pub fn try_begin_drain(&self) -> Option<DrainGuard<'_>> {
        self.drain_gate
            .try_lock()
            .ok()
            .map(|guard| DrainGuard { _guard: guard })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use contracts::LevelControl;
    use std::sync::Arc;

    fn record(n: u32) -> SourceRecord {
        let ts = NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(10, n, 0)
            .unwrap();
        SourceRecord::LevelControl(LevelControl {
            reactor_id: 1,
            timestamp: ts,
            reactor_weight: Some(f64::from(n)),
            volume_reactor: None,
            pid_value: None,
            pump_rpm: None,
            uploaded_at: ts,
        })
    }

    fn queue_in(dir: &tempfile::TempDir) -> SharedQueue {
        SharedQueue::open(QueueStore::new(dir.path().join("queue.json")), true).unwrap()
    }

    #[tokio::test]
    async fn test_append_persists_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let queue = queue_in(&dir);

        assert_eq!(queue.append(vec![record(0), record(1)]).await.unwrap(), 2);
        assert_eq!(queue.append(vec![record(2)]).await.unwrap(), 3);

        assert_eq!(
            queue.store().load(),
            vec![record(0), record(1), record(2)]
        );
    }

    #[tokio::test]
    async fn test_remove_delivered_keeps_failures_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let queue = queue_in(&dir);
        queue
            .append(vec![record(0), record(1), record(2), record(3)])
            .await
            .unwrap();

        let snapshot = queue.snapshot().await;
        let delivered = [snapshot[0].seq, snapshot[2].seq];
        assert_eq!(queue.remove_delivered(&delivered).await.unwrap(), 2);

        assert_eq!(queue.records().await, vec![record(1), record(3)]);
        assert_eq!(queue.store().load(), vec![record(1), record(3)]);
    }

    #[tokio::test]
    async fn test_append_during_drain_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let queue = queue_in(&dir);
        queue.append(vec![record(0)]).await.unwrap();

        let snapshot = queue.snapshot().await;
        // Another watcher appends while the drain is in flight
        queue.append(vec![record(1)]).await.unwrap();
        queue
            .remove_delivered(&[snapshot[0].seq])
            .await
            .unwrap();

        assert_eq!(queue.records().await, vec![record(1)]);
        assert_eq!(queue.store().load(), vec![record(1)]);
    }

    #[tokio::test]
    async fn test_open_without_reset_loads_backlog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        QueueStore::new(&path).save(&[record(4), record(5)]).unwrap();

        let kept = SharedQueue::open(QueueStore::new(&path), false).unwrap();
        assert_eq!(kept.len().await, 2);

        let wiped = SharedQueue::open(QueueStore::new(&path), true).unwrap();
        assert!(wiped.is_empty().await);
        assert!(QueueStore::new(&path).load().is_empty());
    }

    #[tokio::test]
    async fn test_drain_gate_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let queue = queue_in(&dir);

        let first = queue.try_begin_drain();
        assert!(first.is_some());
        assert!(queue.try_begin_drain().is_none());
        drop(first);
        assert!(queue.try_begin_drain().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(queue_in(&dir));

        let mut tasks = Vec::new();
        for n in 0..3u32 {
            let queue = Arc::clone(&queue);
            tasks.push(tokio::spawn(async move {
                for i in 0..5 {
                    queue.append(vec![record(n * 10 + i)]).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(queue.len().await, 15);
        assert_eq!(queue.store().load().len(), 15);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_file_matches_memory_after_racing_append_and_drain() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(queue_in(&dir));
        queue
            .append((0..10).map(record).collect())
            .await
            .unwrap();
        let snapshot = queue.snapshot().await;

        let appender = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                for i in 10..20 {
                    queue.append(vec![record(i)]).await.unwrap();
                }
            })
        };
        let drainer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                for entry in &snapshot {
                    queue.remove_delivered(&[entry.seq]).await.unwrap();
                }
            })
        };
        appender.await.unwrap();
        drainer.await.unwrap();

        let expected: Vec<SourceRecord> = (10..20).map(record).collect();
        assert_eq!(queue.records().await, expected);
        assert_eq!(queue.store().load(), expected);
    }
}
