//! Delivery outcomes - Delivery Client output
//!
//! Failures of a single attempt are values, not errors: the caller decides
//! whether to retry, and a failed record simply stays queued.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of one HTTP attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// HTTP 200; `message` is the optional server acknowledgement
    Delivered { message: Option<String> },

    /// Any non-200 status; `body` is the server response text
    Rejected { status: u16, body: String },

    /// Connect error, timeout or other transport failure
    Unreachable { cause: String },
}

impl AttemptOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered { message: Some(m) } => write!(f, "delivered: {m}"),
            Self::Delivered { message: None } => f.write_str("delivered"),
            Self::Rejected { status, body } => write!(f, "rejected with status {status}: {body}"),
            Self::Unreachable { cause } => write!(f, "unreachable: {cause}"),
        }
    }
}

/// Pipeline-level result of `send`, after all retries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered {
        attempts: u32,
        message: Option<String>,
    },
    /// Every attempt failed; the record must stay queued
    Failed { attempts: u32, last: AttemptOutcome },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Delivered { attempts, .. } | Self::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Health endpoint report (`GET <base>/health`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// True only for HTTP 200
    pub reachable: bool,

    /// HTTP status, absent on transport failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Transport error or unexpected status description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
