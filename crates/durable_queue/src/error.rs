//! Queue error types

use std::path::PathBuf;

use thiserror::Error;

/// Queue persistence errors
#[derive(Debug, Error)]
pub enum QueueError {
    /// Reading or writing the queue file failed
    #[error("queue file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The queue file does not hold a record array
    #[error("queue file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Records could not be encoded
    #[error("failed to encode queue snapshot: {0}")]
    Encode(#[source] serde_json::Error),
}

impl QueueError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;
