//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Resolve per-kind column schemas from `[columns.<kind>]` overrides
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("reactor-watch.toml")).unwrap();
//! println!("Push URL: {}", config.endpoint.push_url());
//! ```

mod parser;
mod validator;

pub use contracts::WatchConfig;
pub use parser::ConfigFormat;

use contracts::{ContractError, RecordKind};
use ingestion::RecordSchema;
use std::path::Path;
use tracing::debug;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<WatchConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        debug!(path = %path.display(), ?format, "loading config");
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<WatchConfig, ContractError> {
        let config = parser::parse(content, format)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate a config assembled in code or patched by CLI overrides
    pub fn validate(config: &WatchConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    /// Column schema for `kind` with the config's overrides applied
    pub fn schema_for(config: &WatchConfig, kind: RecordKind) -> Result<RecordSchema, ContractError> {
        let overrides = config
            .columns
            .iter()
            .find(|(key, _)| RecordKind::from_key(key) == Some(kind))
            .map(|(_, overrides)| overrides);

        match overrides {
            Some(overrides) => RecordSchema::with_overrides(kind, overrides).map_err(|e| {
                ContractError::config_validation(format!("columns.{}", kind.wire_key()), e.to_string())
            }),
            None => Ok(RecordSchema::builtin(kind)),
        }
    }

    /// Serialize WatchConfig to TOML string
    pub fn to_toml(config: &WatchConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize WatchConfig to JSON string
    pub fn to_json(config: &WatchConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        std::fs::read_to_string(path).map_err(|e| ContractError::config_read(path, e))
    }
}
