//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Wire and config contract snapshots
//! - Source file → queue → HTTP endpoint flows against a mock server
//! - Queue behaviour across restarts

#[cfg(test)]
mod contract_tests {
    use chrono::NaiveDate;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{LevelControl, RecordKind, SourceRecord};

    #[test]
    fn test_record_wire_shape() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(10, 0, 3)
            .unwrap();
        let record = SourceRecord::LevelControl(LevelControl {
            reactor_id: 3,
            timestamp: ts,
            reactor_weight: Some(12.5),
            volume_reactor: None,
            pid_value: Some(0.4),
            pump_rpm: None,
            uploaded_at: ts,
        });

        let value = serde_json::to_value(&record).unwrap();
        let body = &value["level_control"];
        assert_eq!(body["reactor_id"], 3);
        assert_eq!(body["timestamp"], "2024-01-05T10:00:03");
        assert_eq!(body["pid_value"], 0.4);
        assert!(body["volume_reactor"].is_null());
    }

    #[test]
    fn test_config_round_trip() {
        let config = ConfigLoader::load_from_str(
            r#"
[endpoint]
base_url = "http://localhost:8000"

[[sources]]
kind = "gas"
path = "gas.csv"

[columns.gas]
OUR = "OUR (mmol/l/h)"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let toml = ConfigLoader::to_toml(&config).unwrap();
        let reparsed = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(reparsed.endpoint.base_url, "http://localhost:8000");
        assert_eq!(reparsed.sources.len(), 1);

        let schema = ConfigLoader::schema_for(&reparsed, RecordKind::Gas).unwrap();
        assert_eq!(schema.column_for("OUR"), Some("OUR (mmol/l/h)"));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use contracts::{EndpointConfig, RecordKind, StatusCallback, StatusEvent};
    use delivery::{DeliveryClient, HttpTransport, RetryPolicy};
    use durable_queue::{QueueStore, SharedQueue};
    use httpmock::prelude::*;
    use ingestion::RecordMapper;
    use watcher::{SourceWatcher, WatchState, WatchSupervisor};

    const PUSH_PATH: &str = "/api/v1/dataup/push";

    const LEVEL_HEADER: &str = "Date,Time,Reactor weigt(kg),Volume of Reactor,PID,E. Pump RPM\n";

    fn level_rows(range: std::ops::Range<u32>) -> String {
        range
            .map(|i| format!("2024-01-05,10:{i:02}:00,{}.0,1.2,0.5,30\n", 10 + i))
            .collect()
    }

    struct Rig {
        _dir: tempfile::TempDir,
        source: PathBuf,
        queue_path: PathBuf,
        queue: Arc<SharedQueue>,
        client: Arc<DeliveryClient<HttpTransport>>,
        events: Arc<Mutex<Vec<StatusEvent>>>,
    }

    impl Rig {
        fn new(server: &MockServer, initial_rows: u32) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let source = dir.path().join("level.csv");
            std::fs::write(&source, format!("{LEVEL_HEADER}{}", level_rows(0..initial_rows)))
                .unwrap();

            let queue_path = dir.path().join("queue.json");
            let queue = Arc::new(SharedQueue::open(QueueStore::new(&queue_path), true).unwrap());

            let endpoint = EndpointConfig {
                base_url: server.base_url(),
                request_timeout_secs: 2,
                ..Default::default()
            };
            let client = Arc::new(DeliveryClient::new(
                HttpTransport::new(&endpoint).unwrap(),
                RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(5)),
            ));

            Self {
                _dir: dir,
                source,
                queue_path,
                queue,
                client,
                events: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn status(&self) -> StatusCallback {
            let sink = Arc::clone(&self.events);
            Arc::new(move |e: StatusEvent| sink.lock().unwrap().push(e))
        }

        fn watcher(&self, reactor_id: i64) -> SourceWatcher<HttpTransport> {
            SourceWatcher::new(
                WatchState::new(
                    self.source.clone(),
                    reactor_id,
                    RecordMapper::builtin(RecordKind::LevelControl),
                ),
                Arc::clone(&self.queue),
                Arc::clone(&self.client),
                self.status(),
            )
        }

        fn append(&self, rows: &str) {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&self.source)
                .unwrap();
            file.write_all(rows.as_bytes()).unwrap();
        }

        fn persisted(&self) -> serde_json::Value {
            read_json(&self.queue_path)
        }
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_appended_rows_reach_endpoint() {
        let server = MockServer::start_async().await;
        let push = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(PUSH_PATH)
                    .header("content-type", "application/json")
                    .body_contains("\"level_control\"")
                    .body_contains("\"reactor_id\":3");
                then.status(200).json_body(serde_json::json!({"message": "stored"}));
            })
            .await;

        let rig = Rig::new(&server, 3);
        let mut watcher = rig.watcher(3);

        let report = watcher.poll_once().await;
        assert_eq!(report.append.unwrap().queued, 3);
        assert_eq!(report.drain.unwrap().delivered, 3);
        push.assert_hits_async(3).await;

        rig.append(&level_rows(3..5));
        let report = watcher.poll_once().await;
        assert_eq!(report.append.unwrap().queued, 2);
        push.assert_hits_async(5).await;

        assert_eq!(watcher.state().high_water_mark(), 5);
        assert!(rig.queue.is_empty().await);
        assert_eq!(rig.persisted(), serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_outage_keeps_rows_until_recovery() {
        let server = MockServer::start_async().await;
        let mut outage = server
            .mock_async(|when, then| {
                when.method(POST).path(PUSH_PATH);
                then.status(503).body("Service Unavailable");
            })
            .await;

        let rig = Rig::new(&server, 2);
        let mut watcher = rig.watcher(1);

        watcher.poll_once().await;
        rig.append(&level_rows(2..3));
        watcher.poll_once().await;

        // Every queued row was retried on each pass and kept, oldest first
        assert_eq!(rig.queue.len().await, 3);
        let persisted = rig.persisted();
        assert_eq!(persisted.as_array().unwrap().len(), 3);
        assert_eq!(persisted[0]["level_control"]["timestamp"], "2024-01-05T10:00:00");
        assert_eq!(persisted[2]["level_control"]["timestamp"], "2024-01-05T10:02:00");
        assert_eq!(
            rig.events.lock().unwrap().last().unwrap().to_string(),
            "[Level] Shared queue: 3 items pending"
        );

        outage.delete_async().await;
        let recovered = server
            .mock_async(|when, then| {
                when.method(POST).path(PUSH_PATH);
                then.status(200);
            })
            .await;

        let report = watcher.poll_once().await;
        assert_eq!(report.append.unwrap().queued, 0);
        assert_eq!(report.drain.unwrap().delivered, 3);
        recovered.assert_hits_async(3).await;
        assert_eq!(rig.persisted(), serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped() {
        let server = MockServer::start_async().await;
        let push = server
            .mock_async(|when, then| {
                when.method(POST).path(PUSH_PATH);
                then.status(200);
            })
            .await;

        let rig = Rig::new(&server, 1);
        rig.append("not a date,10:05:00,1,1,1,1\n2024-01-05,,1,1,1,1\n");
        rig.append(&level_rows(6..7));

        let mut watcher = rig.watcher(1);
        let report = watcher.poll_once().await;
        let append = report.append.unwrap();
        assert_eq!(append.new_rows, 4);
        assert_eq!(append.queued, 2);
        assert_eq!(append.skipped, 2);

        push.assert_hits_async(2).await;
        assert_eq!(watcher.state().high_water_mark(), 4);
    }

    #[tokio::test]
    async fn test_restart_reset_and_keep_backlog() {
        let server = MockServer::start_async().await;
        let push = server
            .mock_async(|when, then| {
                when.method(POST).path(PUSH_PATH);
                then.status(500);
            })
            .await;

        // First run leaves two undelivered rows on disk
        let rig = Rig::new(&server, 2);
        rig.watcher(1).poll_once().await;
        assert_eq!(rig.persisted().as_array().unwrap().len(), 2);
        drop(rig.queue);

        // Restart with the backlog kept
        let kept = SharedQueue::open(QueueStore::new(&rig.queue_path), false).unwrap();
        assert_eq!(kept.len().await, 2);
        drop(kept);

        // Restart with reset: file is emptied, backlog dropped
        let reset = SharedQueue::open(QueueStore::new(&rig.queue_path), true).unwrap();
        assert!(reset.is_empty().await);
        assert_eq!(read_json(&rig.queue_path), serde_json::json!([]));

        // 2 rows x 2 attempts
        push.assert_hits_async(4).await;
    }

    #[tokio::test]
    async fn test_supervisor_probe_then_watch() {
        let server = MockServer::start_async().await;
        let health = server
            .mock_async(|when, then| {
                when.method(GET).path("/health");
                then.status(200)
                    .json_body(serde_json::json!({"message": "ok", "version": "1.4.0"}));
            })
            .await;
        let push = server
            .mock_async(|when, then| {
                when.method(POST).path(PUSH_PATH);
                then.status(200);
            })
            .await;

        let rig = Rig::new(&server, 4);
        let mut supervisor = WatchSupervisor::new(
            Arc::clone(&rig.queue),
            Arc::clone(&rig.client),
            rig.status(),
            Duration::from_millis(25),
        );

        let report = supervisor.probe().await;
        assert!(report.reachable);
        assert_eq!(report.version.as_deref(), Some("1.4.0"));
        health.assert_async().await;

        supervisor
            .start(RecordKind::LevelControl, rig.source.clone(), 8)
            .unwrap();
        for _ in 0..200 {
            if push.hits_async().await >= 4 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        supervisor.shutdown().await;

        push.assert_hits_async(4).await;
        let events = rig.events.lock().unwrap();
        assert!(events
            .iter()
            .any(|e| e.to_string() == "[Level] Shared queue cleared"));
        assert!(matches!(events.last(), Some(StatusEvent::Stopped { .. })));
    }
}
