//! # Watcher
//!
//! One polling loop per monitored source file.
//!
//! Each cycle reads the whole source, maps rows beyond the high-water mark
//! into records, appends them to the shared queue, then drains the queue
//! through the delivery client. Failures are reported through the status
//! callback and never end the loop; only `stop()` does.

mod error;
mod handle;
mod source;
mod supervisor;

pub use error::WatcherError;
pub use handle::{WatcherHandle, WatcherState};
pub use source::{AppendReport, CycleReport, DrainReport, SourceWatcher, WatchState};
pub use supervisor::WatchSupervisor;
