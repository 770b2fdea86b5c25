//! Error types for the helpdesk core library
//!
//! Normalization and aggregation never fail; these errors cover the
//! configuration, I/O and fetch paths around them.

use thiserror::Error;

/// Result type alias for helpdesk operations
pub type Result<T> = std::result::Result<T, HelpdeskError>;

/// Main error type for helpdesk operations
#[derive(Error, Debug)]
pub enum HelpdeskError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task not found: {id}")]
    TaskNotFound { id: u64 },

    #[error("Failed to fetch task {id}: {message}")]
    Fetch { id: u64, message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

impl HelpdeskError {
    /// Create a fetch error for the given task id
    pub fn fetch(id: u64, message: impl Into<String>) -> Self {
        Self::Fetch {
            id,
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unknown error
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }
}
