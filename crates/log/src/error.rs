//! Logger errors

use thiserror::Error;

/// Result type for logger setup
pub type LogResult<T> = Result<T, LogError>;

/// Errors raised while building the global subscriber
#[derive(Error, Debug)]
pub enum LogError {
    /// Filter directive could not be parsed
    #[error("Invalid log filter '{directive}': {reason}")]
    Filter {
        /// The rejected directive
        directive: String,
        /// Parser message
        reason: String,
    },

    /// Unknown output format name
    #[error("Unknown log format '{0}' (expected pretty, compact or json)")]
    Format(String),

    /// The installed subscriber rejected a filter swap
    #[error("Failed to reload log filter: {0}")]
    Reload(String),

    /// A global subscriber is already installed
    #[error("Logger already initialized: {0}")]
    AlreadyInitialized(String),
}
