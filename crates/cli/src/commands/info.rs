//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::{RecordKind, WatchConfig};
use delivery::RetryPolicy;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    endpoint: EndpointInfo,
    retry: RetryInfo,
    queue: QueueInfo,
    watch: WatchInfo,
    sources: Vec<SourceInfo>,
    schemas: Vec<SchemaInfo>,
}

#[derive(Serialize)]
struct EndpointInfo {
    push_url: String,
    health_url: String,
    request_timeout_secs: u64,
    probe_timeout_secs: u64,
}

#[derive(Serialize)]
struct RetryInfo {
    max_attempts: u32,
    /// Waits between consecutive attempts
    backoff_secs: Vec<f64>,
}

#[derive(Serialize)]
struct QueueInfo {
    path: String,
    reset_on_start: bool,
}

#[derive(Serialize)]
struct WatchInfo {
    poll_interval_ms: u64,
    reactor_id: i64,
    require_probe: bool,
}

#[derive(Serialize)]
struct SourceInfo {
    kind: RecordKind,
    path: String,
    reactor_id: i64,
}

#[derive(Serialize)]
struct SchemaInfo {
    kind: RecordKind,
    date_column: String,
    time_column: String,
    columns: BTreeMap<&'static str, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let info = build_config_info(&config)?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &WatchConfig) -> Result<ConfigInfo> {
    let policy = RetryPolicy::from_config(&config.retry);
    let backoff_secs = (1..policy.max_attempts())
        .filter_map(|attempt| policy.delay_after(attempt))
        .map(|d| d.as_secs_f64())
        .collect();

    let sources = config
        .sources
        .iter()
        .map(|s| SourceInfo {
            kind: s.kind,
            path: s.path.display().to_string(),
            reactor_id: config.reactor_id_for(s),
        })
        .collect();

    let mut schemas = Vec::new();
    for kind in RecordKind::ALL {
        let schema = config_loader::ConfigLoader::schema_for(config, kind)?;
        schemas.push(SchemaInfo {
            kind,
            date_column: schema.date_column().to_string(),
            time_column: schema.time_column().to_string(),
            columns: schema
                .bindings()
                .iter()
                .map(|b| (b.field, b.column.clone()))
                .collect(),
        });
    }

    Ok(ConfigInfo {
        endpoint: EndpointInfo {
            push_url: config.endpoint.push_url(),
            health_url: config.endpoint.health_url(),
            request_timeout_secs: config.endpoint.request_timeout_secs,
            probe_timeout_secs: config.endpoint.probe_timeout_secs,
        },
        retry: RetryInfo {
            max_attempts: policy.max_attempts(),
            backoff_secs,
        },
        queue: QueueInfo {
            path: config.queue.path.display().to_string(),
            reset_on_start: config.queue.reset_on_start,
        },
        watch: WatchInfo {
            poll_interval_ms: config.watch.poll_interval_ms,
            reactor_id: config.watch.reactor_id,
            require_probe: config.watch.require_probe,
        },
        sources,
        schemas,
    })
}

fn print_config_info(info: &ConfigInfo) {
    println!("=== reactor-watch Configuration ===\n");

    println!("Endpoint");
    println!("   ├─ Push: {}", info.endpoint.push_url);
    println!("   ├─ Health: {}", info.endpoint.health_url);
    println!(
        "   └─ Timeouts: {}s request, {}s probe",
        info.endpoint.request_timeout_secs, info.endpoint.probe_timeout_secs
    );

    println!("\nRetry");
    println!("   ├─ Max attempts: {}", info.retry.max_attempts);
    println!("   └─ Backoff (s): {:?}", info.retry.backoff_secs);

    println!("\nQueue");
    println!("   ├─ File: {}", info.queue.path);
    println!("   └─ Reset on start: {}", info.queue.reset_on_start);

    println!("\nWatch");
    println!("   ├─ Poll interval: {} ms", info.watch.poll_interval_ms);
    println!("   ├─ Reactor id: {}", info.watch.reactor_id);
    println!("   └─ Require probe: {}", info.watch.require_probe);

    println!("\nSources ({})", info.sources.len());
    for (i, source) in info.sources.iter().enumerate() {
        let prefix = if i == info.sources.len() - 1 { "└─" } else { "├─" };
        println!(
            "   {} {} → {} (reactor {})",
            prefix, source.kind, source.path, source.reactor_id
        );
    }

    println!("\nColumn schemas");
    for schema in &info.schemas {
        println!(
            "   {} (date: '{}', time: '{}')",
            schema.kind, schema.date_column, schema.time_column
        );
        for (field, column) in &schema.columns {
            println!("      {:<24} ← '{}'", field, column);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_reflects_overrides() {
        let config = config_loader::ConfigLoader::load_from_str(
            r#"
[retry]
max_attempts = 3

[[sources]]
kind = "dilution"
path = "dilution.csv"
reactor_id = 9

[columns.dilution]
flowrate = "Flow (L/h)"
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        let info = build_config_info(&config).unwrap();
        assert_eq!(info.retry.backoff_secs, vec![2.0, 4.0]);
        assert_eq!(info.sources[0].reactor_id, 9);

        let dilution = info
            .schemas
            .iter()
            .find(|s| s.kind == RecordKind::Dilution)
            .unwrap();
        assert_eq!(dilution.columns["flowrate"], "Flow (L/h)");
        assert_eq!(dilution.date_column, "Date");
    }
}
