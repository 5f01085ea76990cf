//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{RecordKind, WatchConfig};
use std::time::Duration;
use tracing::{info, warn};

use super::load_config;
use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, args);
    config_loader::ConfigLoader::validate(&config).context("Invalid configuration")?;

    info!(
        push_url = %config.endpoint.push_url(),
        sources = config.sources.len(),
        queue = %config.queue.path.display(),
        "Configuration loaded"
    );

    let pipeline_config = PipelineConfig {
        reset_queue: config.queue.reset_on_start && !args.keep_queue,
        probe: config.watch.require_probe && !args.skip_probe,
        duration: if args.duration_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(args.duration_secs))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
        config,
    };

    info!("Starting watchers...");
    let stats = Pipeline::new(pipeline_config)
        .run(setup_shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        delivered = stats.delivery.delivered,
        pending = stats.pending,
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline stopped"
    );
    stats.print_summary();

    info!("reactor-watch finished");
    Ok(())
}

/// CLI flags win over the configuration file
fn apply_overrides(config: &mut WatchConfig, args: &RunArgs) {
    if let Some(ref base_url) = args.base_url {
        info!(base_url = %base_url, "Overriding base URL from CLI");
        config.endpoint.base_url = base_url.clone();
    }
    if let Some(reactor_id) = args.reactor_id {
        info!(reactor_id, "Overriding reactor id from CLI");
        config.watch.reactor_id = reactor_id;
        for source in &mut config.sources {
            source.reactor_id = None;
        }
    }
    if let Some(ref path) = args.queue_file {
        config.queue.path = path.clone();
    }

    let paths = [
        (RecordKind::Gas, &args.gas),
        (RecordKind::LevelControl, &args.level),
        (RecordKind::Dilution, &args.dilution),
    ];
    for (kind, path) in paths {
        if let Some(path) = path {
            info!(%kind, path = %path.display(), "Source from CLI");
            config.set_source(kind, path.clone());
        }
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SourceConfig;
    use std::path::PathBuf;

    #[test]
    fn test_overrides_replace_config_values() {
        let mut config = WatchConfig::default();
        config.sources.push(SourceConfig {
            kind: RecordKind::Gas,
            path: PathBuf::from("old-gas.csv"),
            reactor_id: Some(2),
        });

        let args = RunArgs {
            base_url: Some("http://localhost:8000".to_string()),
            reactor_id: Some(7),
            gas: Some(PathBuf::from("gas.csv")),
            dilution: Some(PathBuf::from("dilution.csv")),
            queue_file: Some(PathBuf::from("/tmp/q.json")),
            ..Default::default()
        };
        apply_overrides(&mut config, &args);

        assert_eq!(config.endpoint.base_url, "http://localhost:8000");
        assert_eq!(config.queue.path, PathBuf::from("/tmp/q.json"));
        assert_eq!(config.sources.len(), 2);

        let gas = config.source(RecordKind::Gas).unwrap();
        assert_eq!(gas.path, PathBuf::from("gas.csv"));
        assert_eq!(config.reactor_id_for(gas), 7);
        assert!(config.source(RecordKind::LevelControl).is_none());
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = WatchConfig::default();
        apply_overrides(&mut config, &RunArgs::default());
        assert_eq!(config.endpoint.base_url, WatchConfig::default().endpoint.base_url);
        assert!(config.sources.is_empty());
    }
}
