//! # Durable Queue
//!
//! The process-wide pending queue of records awaiting delivery.
//!
//! - [`QueueStore`]: the persisted snapshot, a JSON array of record
//!   wrappers rewritten wholesale through a temp file + rename
//! - [`SharedQueue`]: the single in-memory queue shared by all watchers,
//!   guarded by one lock around every modify-save
//!
//! ## Usage Example
//!
//! ```ignore
//! let queue = Arc::new(SharedQueue::open(QueueStore::new("queue.json"), true)?);
//! queue.append(records).await?;
//!
//! if let Some(_drain) = queue.try_begin_drain() {
//!     let pending = queue.snapshot().await;
//!     // ... deliver, collect delivered ids ...
//!     queue.remove_delivered(&delivered).await?;
//! }
//! ```

mod error;
mod shared;
mod store;

pub use error::{QueueError, Result};
pub use shared::{DrainGuard, QueueEntry, SharedQueue};
pub use store::QueueStore;
