//! QueueStore - persisted queue snapshot
//!
//! The file always holds a complete JSON array. Saves go to a sibling temp
//! file which is fsynced and renamed over the target, so a reader sees
//! either the previous snapshot or the new one.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use contracts::SourceRecord;
use tracing::{debug, instrument, warn};

use crate::error::{QueueError, Result};

/// Persisted pending-queue file
#[derive(Debug, Clone)]
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted snapshot.
    ///
    /// A missing file is an empty queue; an unreadable or corrupt file is
    /// logged and also treated as empty.
    #[instrument(name = "queue_store_load", skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Vec<SourceRecord> {
        match self.try_load() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "queue snapshot unusable, starting empty");
                Vec::new()
            }
        }
    }

    /// Read the persisted snapshot, surfacing read and parse failures.
    ///
    /// A missing file still yields an empty queue.
    pub fn try_load(&self) -> Result<Vec<SourceRecord>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no queue file yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(QueueError::io(&self.path, e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|source| QueueError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Atomically replace the persisted snapshot with `records`.
    #[instrument(
        name = "queue_store_save",
        skip(self, records),
        fields(path = %self.path.display(), len = records.len())
    )]
    pub fn save(&self, records: &[SourceRecord]) -> Result<()> {
        let encoded = serde_json::to_vec_pretty(records).map_err(QueueError::Encode)?;
        self.replace_contents(&encoded)
            .map_err(|e| QueueError::io(&self.path, e))?;
        debug!("queue snapshot written");
        Ok(())
    }

    /// Clear the persisted snapshot unconditionally (writes `[]`).
    pub fn reset(&self) -> Result<()> {
        self.save(&[])
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "queue.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn replace_contents(&self, bytes: &[u8]) -> io::Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = parent {
            fs::create_dir_all(dir)?;
        }

        let tmp_path = self.temp_path();
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        // Directory fsync makes the rename itself durable
        if let Some(dir) = parent {
            if let Ok(handle) = File::open(dir) {
                if let Err(sync_err) = handle.sync_all() {
                    debug!(dir = %dir.display(), error = %sync_err, "directory fsync failed");
                }
            }
        }
        Ok(())
    }
}
