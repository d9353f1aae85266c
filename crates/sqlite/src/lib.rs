//! # loanpool-sqlite
//!
//! SQLite connections for [`loanpool`].
//!
//! [`SqliteManager`] opens `rusqlite` connections with a busy timeout and
//! optional setup statements, checks them with `SELECT 1` when they come
//! back, and closes them explicitly when the pool discards them.
//!
//! ```no_run
//! use loanpool::PoolConfig;
//! use loanpool_sqlite::SqliteConfig;
//!
//! let pool = loanpool_sqlite::pool(
//!     SqliteConfig::new("app.db").with_init_sql("PRAGMA journal_mode = WAL;"),
//!     PoolConfig::with_capacity(4),
//! )?;
//!
//! let conn = pool.get()?;
//! conn.execute_batch("CREATE TABLE IF NOT EXISTS kv (k TEXT PRIMARY KEY, v TEXT)")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod error;
mod manager;

pub use config::{OpenMode, SqliteConfig};
pub use error::{SqliteError, SqliteResult};
pub use manager::SqliteManager;

/// A pool of SQLite connections.
pub type SqlitePool = loanpool::Pool<SqliteManager>;

/// Build a pool of connections described by `config`.
///
/// Fails with [`SqliteError::Configuration`] for invalid settings, or with
/// [`SqliteError::Pool`] when the pool configuration is invalid or the
/// initial connections cannot be opened.
pub fn pool(config: SqliteConfig, pool_config: loanpool::PoolConfig) -> SqliteResult<SqlitePool> {
    let manager = SqliteManager::new(config)?;
    Ok(loanpool::Pool::new(manager, pool_config)?)
}
