//! WatcherHandle - runs a SourceWatcher loop on its own task
//!
//! State machine: `Idle → Running → Stopped`. `stop()` is observed at the
//! top of the next iteration; an in-flight drain finishes first.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{RecordKind, RecordTransport, StatusEvent};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::source::SourceWatcher;

/// Lifecycle of one watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Running,
    /// Terminal
    Stopped,
}

impl WatcherState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::Stopped => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Running,
            _ => Self::Stopped,
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    wake: Notify,
}

impl Shared {
    fn state(&self) -> WatcherState {
        WatcherState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set(&self, state: WatcherState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

/// Handle to a running watcher task
pub struct WatcherHandle {
    kind: RecordKind,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Spawn the polling loop for `watcher`
    pub fn start<T>(watcher: SourceWatcher<T>, poll_interval: Duration) -> Self
    where
        T: RecordTransport + Send + Sync + 'static,
    {
        let kind = watcher.kind();
        let shared = Arc::new(Shared {
            state: AtomicU8::new(WatcherState::Idle.as_u8()),
            wake: Notify::new(),
        });
        // Running before the task is scheduled, so an immediate stop() is honoured
        shared.set(WatcherState::Running);

        let task_shared = Arc::clone(&shared);
        let task = tokio::spawn(async move {
            watch_loop(watcher, task_shared, poll_interval).await;
        });

        Self { kind, shared, task }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn state(&self) -> WatcherState {
        self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == WatcherState::Running
    }

    /// Request the loop to stop; it exits at the next iteration boundary
    pub fn stop(&self) {
        self.shared.set(WatcherState::Stopped);
        self.shared.wake.notify_one();
    }

    /// Wait for the loop to exit
    #[instrument(name = "watcher_handle_join", skip(self), fields(kind = %self.kind))]
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!(kind = %self.kind, error = ?e, "watcher task panicked");
        }
        debug!(kind = %self.kind, "watcher joined");
    }

    /// `stop()` then `join()`
    pub async fn shutdown(self) {
        self.stop();
        self.join().await;
    }
}

#[instrument(name = "watcher_loop", skip_all, fields(kind = %watcher.kind()))]
async fn watch_loop<T>(mut watcher: SourceWatcher<T>, shared: Arc<Shared>, poll_interval: Duration)
where
    T: RecordTransport + Send + Sync + 'static,
{
    let kind = watcher.kind();
    info!(path = %watcher.state().path().display(), "watcher started");
    watcher.emit(StatusEvent::Started {
        kind,
        path: watcher.state().path().display().to_string(),
    });

    while shared.state() == WatcherState::Running {
        watcher.poll_once().await;

        if shared.state() != WatcherState::Running {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = shared.wake.notified() => {}
        }
    }

    shared.set(WatcherState::Stopped);
    info!(mark = watcher.state().high_water_mark(), "watcher stopped");
    watcher.emit(StatusEvent::Stopped { kind });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::WatchState;
    use delivery::{DeliveryClient, RetryPolicy, ScriptedTransport};
    use durable_queue::{QueueStore, SharedQueue};
    use ingestion::RecordMapper;
    use std::sync::Mutex;

    const SOURCE: &str = "Date,Time,Time passed,Flowrate\n\
                          2024-01-05,10:00:00,0,0.1\n\
                          2024-01-05,10:00:03,3,0.1\n";

    fn spawn(
        dir: &tempfile::TempDir,
        transport: ScriptedTransport,
        poll_interval: Duration,
    ) -> (WatcherHandle, Arc<SharedQueue>, Arc<Mutex<Vec<StatusEvent>>>) {
        let source = dir.path().join("dilution.csv");
        std::fs::write(&source, SOURCE).unwrap();

        let queue = Arc::new(
            SharedQueue::open(QueueStore::new(dir.path().join("queue.json")), true).unwrap(),
        );
        let client = Arc::new(DeliveryClient::new(
            transport,
            RetryPolicy::new(1, Duration::from_millis(1), Duration::from_millis(1)),
        ));
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        let watcher = SourceWatcher::new(
            WatchState::new(source, 5, RecordMapper::builtin(RecordKind::Dilution)),
            Arc::clone(&queue),
            client,
            Arc::new(move |e: StatusEvent| sink.lock().unwrap().push(e)),
        );
        (WatcherHandle::start(watcher, poll_interval), queue, events)
    }

    #[tokio::test]
    async fn test_loop_delivers_then_stops() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, queue, events) =
            spawn(&dir, ScriptedTransport::accepting(), Duration::from_millis(20));
        assert!(handle.is_running());

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.stop();
        assert_eq!(handle.state(), WatcherState::Stopped);
        handle.join().await;

        assert!(queue.is_empty().await);
        let events = events.lock().unwrap();
        assert!(matches!(events.first(), Some(StatusEvent::Started { .. })));
        assert!(matches!(events.last(), Some(StatusEvent::Stopped { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, StatusEvent::Delivered { count: 2, .. })));
    }

    #[tokio::test]
    async fn test_stop_interrupts_long_sleep() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, queue, _events) =
            spawn(&dir, ScriptedTransport::unavailable(), Duration::from_secs(3600));

        tokio::time::sleep(Duration::from_millis(50)).await;
        tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .expect("watcher should stop promptly");

        // Failed deliveries stay queued
        assert_eq!(queue.len().await, 2);
    }
}
