//! SQLite manager errors

use std::path::PathBuf;

use thiserror::Error;

/// Result type for SQLite manager operations
pub type SqliteResult<T> = Result<T, SqliteError>;

/// Errors raised while opening or preparing SQLite connections
#[derive(Error, Debug)]
pub enum SqliteError {
    /// Manager configuration is invalid
    #[error("Invalid SQLite configuration: {0}")]
    Configuration(String),

    /// The database file could not be opened
    #[error("Failed to open SQLite database '{}'", path.display())]
    Open {
        /// Database path
        path: PathBuf,
        /// Driver error
        #[source]
        source: rusqlite::Error,
    },

    /// A freshly opened connection rejected its setup statements
    #[error("Failed to prepare SQLite connection to '{}'", path.display())]
    Setup {
        /// Database path
        path: PathBuf,
        /// Driver error
        #[source]
        source: rusqlite::Error,
    },

    /// Building the pool failed
    #[error(transparent)]
    Pool(#[from] loanpool::Error),
}
