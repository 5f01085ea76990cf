//! Configuration validation
//!
//! Rules:
//! - endpoint base_url is an absolute http(s) URL
//! - max_attempts >= 1, timeouts and poll interval > 0
//! - at most one source per record kind, non-empty paths
//! - `[columns.<kind>]` keys name a record kind and its fields

use std::collections::HashSet;

use contracts::{ContractError, RecordKind, WatchConfig};
use ingestion::RecordSchema;

/// Validate a `WatchConfig`
///
/// Returns the first error encountered.
pub fn validate(config: &WatchConfig) -> Result<(), ContractError> {
    validate_endpoint(config)?;
    validate_retry(config)?;
    validate_watch(config)?;
    validate_sources(config)?;
    validate_columns(config)?;
    Ok(())
}

fn validate_endpoint(config: &WatchConfig) -> Result<(), ContractError> {
    let endpoint = &config.endpoint;
    let base = endpoint.base_url.trim();
    let rest = base
        .strip_prefix("http://")
        .or_else(|| base.strip_prefix("https://"))
        .ok_or_else(|| {
            ContractError::config_validation(
                "endpoint.base_url",
                format!("expected an http:// or https:// URL, got '{base}'"),
            )
        })?;
    if rest.trim_matches('/').is_empty() {
        return Err(ContractError::config_validation(
            "endpoint.base_url",
            "missing host",
        ));
    }

    if endpoint.request_timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "endpoint.request_timeout_secs",
            "request_timeout_secs must be > 0",
        ));
    }
    if endpoint.probe_timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "endpoint.probe_timeout_secs",
            "probe_timeout_secs must be > 0",
        ));
    }
    Ok(())
}

fn validate_retry(config: &WatchConfig) -> Result<(), ContractError> {
    if config.retry.max_attempts == 0 {
        return Err(ContractError::config_validation(
            "retry.max_attempts",
            "max_attempts must be >= 1",
        ));
    }
    Ok(())
}

fn validate_watch(config: &WatchConfig) -> Result<(), ContractError> {
    if config.watch.poll_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "watch.poll_interval_ms",
            "poll_interval_ms must be > 0",
        ));
    }
    Ok(())
}

fn validate_sources(config: &WatchConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, source) in config.sources.iter().enumerate() {
        if !seen.insert(source.kind) {
            return Err(ContractError::config_validation(
                format!("sources[{idx}].kind"),
                format!("duplicate source for kind '{}'", source.kind),
            ));
        }
        if source.path.as_os_str().is_empty() {
            return Err(ContractError::config_validation(
                format!("sources[{idx}].path"),
                "source path cannot be empty",
            ));
        }
    }
    Ok(())
}

fn validate_columns(config: &WatchConfig) -> Result<(), ContractError> {
    for (key, overrides) in &config.columns {
        let kind = RecordKind::from_key(key).ok_or_else(|| {
            ContractError::config_validation(
                format!("columns.{key}"),
                "expected one of gas, level_control, dilution",
            )
        })?;
        RecordSchema::with_overrides(kind, overrides)
            .map_err(|e| ContractError::config_validation(format!("columns.{key}"), e.to_string()))?;
    }
    Ok(())
}
