//! Delivery error types
//!
//! Only construction can fail; per-attempt failures are `AttemptOutcome`s.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Endpoint URL does not parse
    #[error("invalid endpoint url '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// HTTP client could not be built
    #[error("failed to build http client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

impl DeliveryError {
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }
}
