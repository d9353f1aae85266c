//! SQLite connection settings

use std::path::PathBuf;
use std::time::Duration;

use rusqlite::OpenFlags;
use serde::{Deserialize, Serialize};

use crate::error::{SqliteError, SqliteResult};

/// How connections open the database file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    /// Existing file, reads only
    ReadOnly,
    /// Existing file, reads and writes
    ReadWrite,
    /// Read-write, creating the file if missing
    #[default]
    Create,
}

impl OpenMode {
    pub(crate) fn flags(self) -> OpenFlags {
        let base = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        match self {
            Self::ReadOnly => base | OpenFlags::SQLITE_OPEN_READ_ONLY,
            Self::ReadWrite => base | OpenFlags::SQLITE_OPEN_READ_WRITE,
            Self::Create => {
                base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
        }
    }
}

/// Settings applied to every connection the manager opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file, or `:memory:` for a private in-memory database per connection
    pub path: PathBuf,
    /// How long a statement retries on a locked database
    pub busy_timeout: Duration,
    /// Statements run once on each new connection (pragmas, schema)
    pub init_sql: Option<String>,
    /// Open mode
    pub mode: OpenMode,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("loanpool.db"),
            busy_timeout: Duration::from_secs(5),
            init_sql: None,
            mode: OpenMode::Create,
        }
    }
}

impl SqliteConfig {
    /// Settings for the database at `path`, defaults elsewhere.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the busy timeout
    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Set statements to run on each new connection
    #[must_use]
    pub fn with_init_sql(mut self, sql: impl Into<String>) -> Self {
        self.init_sql = Some(sql.into());
        self
    }

    /// Set the open mode
    #[must_use]
    pub fn with_mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> SqliteResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(SqliteError::Configuration(
                "path must not be empty".to_string(),
            ));
        }
        if self.is_memory() && self.mode == OpenMode::ReadOnly {
            return Err(SqliteError::Configuration(
                "an in-memory database cannot be opened read-only".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn is_memory(&self) -> bool {
        self.path.as_os_str() == ":memory:"
    }
}
