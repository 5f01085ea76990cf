//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::WatchConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    push_url: String,
    health_url: String,
    source_count: usize,
    queue_path: String,
    max_attempts: u32,
    poll_interval_ms: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    push_url: config.endpoint.push_url(),
                    health_url: config.endpoint.health_url(),
                    source_count: config.sources.len(),
                    queue_path: config.queue.path.display().to_string(),
                    max_attempts: config.retry.max_attempts,
                    poll_interval_ms: config.watch.poll_interval_ms,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Non-fatal issues
fn collect_warnings(config: &WatchConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.sources.is_empty() {
        warnings.push("No sources configured - pass --gas/--level/--dilution to `run`".to_string());
    }

    for source in &config.sources {
        if !source.path.exists() {
            warnings.push(format!(
                "Source '{}' does not exist yet: {}",
                source.kind,
                source.path.display()
            ));
        }
    }

    if !config.queue.reset_on_start {
        warnings.push(format!(
            "queue.reset_on_start is false - backlog in {} will be re-sent",
            config.queue.path.display()
        ));
    }

    if !config.watch.require_probe {
        warnings.push("watch.require_probe is false - watchers start even when the endpoint is down".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Push URL: {}", summary.push_url);
            println!("  Health URL: {}", summary.health_url);
            println!("  Sources: {}", summary.source_count);
            println!("  Queue file: {}", summary.queue_path);
            println!("  Max attempts: {}", summary.max_attempts);
            println!("  Poll interval: {} ms", summary.poll_interval_ms);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
