//! Command implementations.

mod info;
mod probe;
mod run;
mod validate;

pub use info::run_info;
pub use probe::run_probe;
pub use run::run_pipeline;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::WatchConfig;
use tracing::info;

/// Load `path`, or fall back to built-in defaults when no file is given
fn load_config(path: Option<&Path>) -> Result<WatchConfig> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            info!(config = %path.display(), "Loading configuration");
            config_loader::ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => {
            info!("No configuration file given, using defaults");
            Ok(WatchConfig::default())
        }
    }
}
