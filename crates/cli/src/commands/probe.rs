//! `probe` command implementation.

use anyhow::{Context, Result};
use delivery::{DeliveryClient, HttpTransport, RetryPolicy};
use tracing::info;

use super::load_config;
use crate::cli::ProbeArgs;

/// Execute the `probe` command
pub async fn run_probe(args: &ProbeArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(ref base_url) = args.base_url {
        info!(base_url = %base_url, "Overriding base URL from CLI");
        config.endpoint.base_url = base_url.clone();
    }

    let transport = HttpTransport::new(&config.endpoint).context("Failed to build HTTP client")?;
    let health_url = transport.health_url().to_string();
    let client = DeliveryClient::new(transport, RetryPolicy::from_config(&config.retry));

    let report = client.probe().await;

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize health report")?;
        println!("{}", json);
    } else if report.reachable {
        println!("✓ Endpoint reachable: {}", health_url);
        if let Some(ref message) = report.message {
            println!("  Message: {}", message);
        }
        if let Some(ref version) = report.version {
            println!("  Version: {}", version);
        }
    } else {
        println!("✗ Endpoint unreachable: {}", health_url);
        if let Some(ref error) = report.error {
            println!("\n  Error: {}", error);
        }
    }

    if report.reachable {
        Ok(())
    } else {
        anyhow::bail!("Endpoint unreachable: {}", health_url)
    }
}
