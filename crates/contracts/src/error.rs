//! Configuration errors shared by the loader and the CLI
//!
//! Runtime failures (source reads, queue writes, transport) are reported by
//! the crates that own them.

use std::path::PathBuf;

use thiserror::Error;

/// A watch configuration could not be loaded
#[derive(Debug, Error)]
pub enum ContractError {
    /// The config file could not be read
    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config text is not valid TOML/JSON or has the wrong shape
    #[error("invalid config: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A setting is out of range or inconsistent with another
    #[error("invalid setting '{field}': {message}")]
    ConfigValidation { field: String, message: String },
}

impl ContractError {
    pub fn config_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigRead {
            path: path.into(),
            source,
        }
    }

    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_messages_name_the_setting() {
        let err = ContractError::config_validation("retry.max_attempts", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid setting 'retry.max_attempts': must be at least 1"
        );
    }

    #[test]
    fn test_read_error_keeps_path_and_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ContractError::config_read("/etc/reactor-watch.toml", io);
        assert_eq!(err.to_string(), "cannot read config /etc/reactor-watch.toml: gone");
        assert!(err.source().is_some());
    }
}
