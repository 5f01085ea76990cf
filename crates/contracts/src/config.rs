//! WatchConfig - Config Loader output
//!
//! Describes the remote endpoint, retry policy, queue file, polling
//! cadence, monitored sources and column-name overrides. Every section
//! has defaults so a minimal file only needs `[[sources]]`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::RecordKind;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Column overrides: record kind key → (field name → source column)
pub type ColumnOverrides = BTreeMap<String, BTreeMap<String, String>>;

/// Complete watcher configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub version: ConfigVersion,

    #[serde(default)]
    pub endpoint: EndpointConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub watch: WatchSettings,

    /// Monitored source files, at most one per record kind
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    #[serde(default)]
    pub columns: ColumnOverrides,
}

impl WatchConfig {
    /// Reactor id for a source: its own override or the global one
    pub fn reactor_id_for(&self, source: &SourceConfig) -> i64 {
        source.reactor_id.unwrap_or(self.watch.reactor_id)
    }

    /// Source configured for `kind`, if any
    pub fn source(&self, kind: RecordKind) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.kind == kind)
    }

    /// Replace or insert the source for `kind`
    pub fn set_source(&mut self, kind: RecordKind, path: PathBuf) {
        match self.sources.iter_mut().find(|s| s.kind == kind) {
            Some(existing) => existing.path = path,
            None => self.sources.push(SourceConfig {
                kind,
                path,
                reactor_id: None,
            }),
        }
    }
}

/// Remote ingestion endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_push_path")]
    pub push_path: String,

    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Per-attempt timeout for pushes
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Timeout for the health probe
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    #[serde(default)]
    pub user_agent: Option<String>,
}

impl EndpointConfig {
    pub fn push_url(&self) -> String {
        join_url(&self.base_url, &self.push_path)
    }

    pub fn health_url(&self) -> String {
        join_url(&self.base_url, &self.health_path)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            push_path: default_push_path(),
            health_path: default_health_path(),
            request_timeout_secs: default_request_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            user_agent: None,
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn default_base_url() -> String {
    "https://bio-monitor.onrender.com".to_string()
}

fn default_push_path() -> String {
    "/api/v1/dataup/push".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_probe_timeout_secs() -> u64 {
    5
}

/// Retry/backoff policy for pushes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per record per drain pass, >= 1
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff unit; the wait after attempt `n` is `2^n` units
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,

    /// Upper bound on a single wait
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_unit_ms: default_backoff_unit_ms(),
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

fn default_max_backoff_secs() -> u64 {
    30
}

/// Persisted pending-queue file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_path")]
    pub path: PathBuf,

    /// Truncate the queue file to `[]` at process start
    #[serde(default = "default_true")]
    pub reset_on_start: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            path: default_queue_path(),
            reset_on_start: true,
        }
    }
}

fn default_queue_path() -> PathBuf {
    PathBuf::from("queue.json")
}

fn default_true() -> bool {
    true
}

/// Polling behaviour shared by all watchers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Reactor id used by sources without their own
    #[serde(default = "default_reactor_id")]
    pub reactor_id: i64,

    /// Refuse to start watching when the health probe fails
    #[serde(default = "default_true")]
    pub require_probe: bool,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            reactor_id: default_reactor_id(),
            require_probe: true,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_reactor_id() -> i64 {
    1
}

/// One monitored source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub kind: RecordKind,

    pub path: PathBuf,

    #[serde(default)]
    pub reactor_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint_urls() {
        let endpoint = EndpointConfig::default();
        assert_eq!(
            endpoint.push_url(),
            "https://bio-monitor.onrender.com/api/v1/dataup/push"
        );
        assert_eq!(endpoint.health_url(), "https://bio-monitor.onrender.com/health");
    }

    #[test]
    fn test_url_join_trims_slashes() {
        let endpoint = EndpointConfig {
            base_url: "http://localhost:8080/".to_string(),
            health_path: "health".to_string(),
            ..Default::default()
        };
        assert_eq!(endpoint.health_url(), "http://localhost:8080/health");
    }

    #[test]
    fn test_set_source_replaces_existing() {
        let mut config = WatchConfig::default();
        config.set_source(RecordKind::Gas, PathBuf::from("a.csv"));
        config.set_source(RecordKind::Gas, PathBuf::from("b.csv"));
        assert_eq!(config.sources.len(), 1);
        assert_eq!(
            config.source(RecordKind::Gas).unwrap().path,
            PathBuf::from("b.csv")
        );
    }

    #[test]
    fn test_reactor_id_fallback() {
        let mut config = WatchConfig::default();
        config.watch.reactor_id = 7;
        let own = SourceConfig {
            kind: RecordKind::Dilution,
            path: PathBuf::from("d.csv"),
            reactor_id: Some(3),
        };
        let shared = SourceConfig {
            reactor_id: None,
            ..own.clone()
        };
        assert_eq!(config.reactor_id_for(&own), 3);
        assert_eq!(config.reactor_id_for(&shared), 7);
    }
}
