//! [`Manager`] implementation over `rusqlite` connections

use rusqlite::Connection;

use loanpool::Manager;

use crate::config::SqliteConfig;
use crate::error::{SqliteError, SqliteResult};

/// Opens, checks and closes SQLite connections for a pool.
#[derive(Debug)]
pub struct SqliteManager {
    config: SqliteConfig,
}

impl SqliteManager {
    /// Create a manager after validating `config`.
    pub fn new(config: SqliteConfig) -> SqliteResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Connection settings
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    fn open(&self) -> SqliteResult<Connection> {
        let path = &self.config.path;
        let conn = if self.config.is_memory() {
            Connection::open_in_memory_with_flags(self.config.mode.flags())
        } else {
            Connection::open_with_flags(path, self.config.mode.flags())
        }
        .map_err(|source| SqliteError::Open {
            path: path.clone(),
            source,
        })?;

        let setup = |source| SqliteError::Setup {
            path: path.clone(),
            source,
        };
        conn.busy_timeout(self.config.busy_timeout).map_err(setup)?;
        if let Some(sql) = &self.config.init_sql {
            conn.execute_batch(sql).map_err(setup)?;
        }
        Ok(conn)
    }
}

impl Manager for SqliteManager {
    type Handle = Connection;
    type Error = SqliteError;

    fn id(&self) -> &str {
        "sqlite"
    }

    fn create(&self) -> SqliteResult<Connection> {
        let conn = self.open()?;
        tracing::trace!(path = %self.config.path.display(), "sqlite connection opened");
        Ok(conn)
    }

    /// A connection is reusable when it answers `SELECT 1` and has no
    /// transaction left open by the previous borrower.
    fn is_valid(&self, conn: &mut Connection) -> bool {
        if !conn.is_autocommit() {
            tracing::debug!(
                path = %self.config.path.display(),
                "connection returned inside an open transaction"
            );
            return false;
        }
        match conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)) {
            Ok(1) => true,
            Ok(other) => {
                tracing::debug!(value = other, "unexpected liveness check result");
                false
            }
            Err(e) => {
                tracing::debug!(error = %e, "liveness check failed");
                false
            }
        }
    }

    fn close(&self, conn: Connection) {
        if let Err((_conn, e)) = conn.close() {
            tracing::warn!(
                path = %self.config.path.display(),
                error = %e,
                "failed to close sqlite connection"
            );
        }
    }
}
