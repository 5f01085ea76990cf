//! Status events - Watcher → collaborator (GUI/CLI) boundary
//!
//! Every observable state change of a watcher is reported as a
//! `StatusEvent`. Its `Display` form is the human-readable status line.

use std::fmt;
use std::sync::Arc;

use crate::RecordKind;

/// Status callback type
///
/// Invoked from watcher tasks; implementations must be cheap and must not block.
pub type StatusCallback = Arc<dyn Fn(StatusEvent) + Send + Sync>;

/// Observable watcher state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Watcher loop entered `Running`
    Started { kind: RecordKind, path: String },

    /// New rows were detected and appended to the queue
    Queued {
        kind: RecordKind,
        new_rows: usize,
        queued: usize,
        skipped: usize,
    },

    /// A drain pass delivered records from the shared queue.
    ///
    /// For the drain events `kind` is the watcher that ran the pass; the
    /// counts cover records from every source.
    Delivered { kind: RecordKind, count: usize },

    /// Records from any source still waiting after a drain pass
    Pending { kind: RecordKind, count: usize },

    /// A drain pass emptied the shared queue
    QueueCleared { kind: RecordKind },

    /// Source file could not be read
    SourceError { kind: RecordKind, message: String },

    /// Queue snapshot could not be written
    PersistenceError { kind: RecordKind, message: String },

    /// Watcher loop exited
    Stopped { kind: RecordKind },
}

impl StatusEvent {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Started { kind, .. }
            | Self::Queued { kind, .. }
            | Self::Delivered { kind, .. }
            | Self::Pending { kind, .. }
            | Self::QueueCleared { kind }
            | Self::SourceError { kind, .. }
            | Self::PersistenceError { kind, .. }
            | Self::Stopped { kind } => *kind,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::SourceError { .. } | Self::PersistenceError { .. }
        )
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.kind().label())?;
        match self {
            Self::Started { path, .. } => write!(f, "Watching {path}"),
            Self::Queued {
                new_rows,
                queued,
                skipped: 0,
                ..
            } if new_rows == queued => write!(f, "Queued {queued} new rows"),
            Self::Queued {
                new_rows,
                queued,
                skipped,
                ..
            } => write!(
                f,
                "Queued {queued} of {new_rows} new rows ({skipped} skipped: invalid date/time)"
            ),
            Self::Delivered { count, .. } => write!(f, "Shared queue: delivered {count} records"),
            Self::Pending { count, .. } => write!(f, "Shared queue: {count} items pending"),
            Self::QueueCleared { .. } => f.write_str("Shared queue cleared"),
            Self::SourceError { message, .. } => write!(f, "Error: {message}"),
            Self::PersistenceError { message, .. } => {
                write!(f, "Error: queue persistence failed: {message}")
            }
            Self::Stopped { .. } => f.write_str("Stopped watching"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lines() {
        let queued = StatusEvent::Queued {
            kind: RecordKind::Gas,
            new_rows: 3,
            queued: 3,
            skipped: 0,
        };
        assert_eq!(queued.to_string(), "[Gas] Queued 3 new rows");

        let partial = StatusEvent::Queued {
            kind: RecordKind::Dilution,
            new_rows: 3,
            queued: 2,
            skipped: 1,
        };
        assert_eq!(
            partial.to_string(),
            "[Dilution] Queued 2 of 3 new rows (1 skipped: invalid date/time)"
        );

        let pending = StatusEvent::Pending {
            kind: RecordKind::LevelControl,
            count: 4,
        };
        assert_eq!(pending.to_string(), "[Level] Shared queue: 4 items pending");

        let cleared = StatusEvent::QueueCleared {
            kind: RecordKind::Gas,
        };
        assert_eq!(cleared.to_string(), "[Gas] Shared queue cleared");
    }

    #[test]
    fn test_error_events() {
        let err = StatusEvent::SourceError {
            kind: RecordKind::Gas,
            message: "File not found: gas.csv".to_string(),
        };
        assert!(err.is_error());
        assert_eq!(err.to_string(), "[Gas] Error: File not found: gas.csv");
        assert!(!StatusEvent::Stopped {
            kind: RecordKind::Gas
        }
        .is_error());
    }
}
