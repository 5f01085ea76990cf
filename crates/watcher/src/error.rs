//! Watcher error types
//!
//! Cycle failures (unreadable source, queue save) are reported as status
//! events, never as errors; only control calls can fail.

use contracts::RecordKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatcherError {
    /// `start` called for a kind that is already being watched
    #[error("a watcher for '{kind}' is already running")]
    AlreadyRunning { kind: RecordKind },
}
