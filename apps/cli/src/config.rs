//! Layered configuration: defaults → TOML file → `LOANPOOL_*` env → flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use figment::Figment;
use figment::providers::{Env, Format as _, Serialized, Toml};
use loanpool::PoolConfig;
use loanpool_sqlite::{OpenMode, SqliteConfig};
use serde::{Deserialize, Serialize};

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "LOANPOOL_";

/// Pool settings read from the same flat variables as
/// [`PoolConfig::from_env`], e.g. `LOANPOOL_CAPACITY=4`.
const POOL_ENV_KEYS: [&str; 4] = [
    "name",
    "capacity",
    "acquire_timeout_ms",
    "validate_on_release",
];

/// Environment variables shown in `--help`.
pub const ENV_HELP: &str = "\
Environment:
  LOANPOOL_NAME, LOANPOOL_CAPACITY, LOANPOOL_ACQUIRE_TIMEOUT_MS,
  LOANPOOL_VALIDATE_ON_RELEASE      pool settings
  LOANPOOL_SQLITE__<KEY>            [sqlite] settings, e.g. LOANPOOL_SQLITE__PATH
  LOANPOOL_LOG, LOANPOOL_LOG_FORMAT log filter and format (RUST_LOG as fallback)
  LOANPOOL_CONFIG                   configuration file";

/// Everything the binary can be configured with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pool: PoolSection,
    pub sqlite: SqliteSection,
    pub logging: loanpool_log::Config,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pool: PoolSection::default(),
            sqlite: SqliteSection::default(),
            logging: loanpool_log::Config::from_env(),
        }
    }
}

/// Acquire timeout as written in a file or variable: milliseconds, or
/// `"none"` to wait without limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeoutSetting {
    Millis(u64),
    Named(String),
}

impl TimeoutSetting {
    fn resolve(&self) -> Result<Option<Duration>> {
        match self {
            Self::Millis(ms) => Ok(Some(Duration::from_millis(*ms))),
            Self::Named(raw) => Ok(loanpool::config::parse_timeout_ms(raw)?),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSection {
    pub name: String,
    pub capacity: usize,
    pub acquire_timeout_ms: TimeoutSetting,
    pub validate_on_release: bool,
}

impl Default for PoolSection {
    fn default() -> Self {
        let defaults = PoolConfig::default();
        Self {
            name: defaults.name,
            capacity: defaults.capacity,
            acquire_timeout_ms: defaults.acquire_timeout.map_or_else(
                || TimeoutSetting::Named("none".to_string()),
                |t| TimeoutSetting::Millis(t.as_millis() as u64),
            ),
            validate_on_release: defaults.validate_on_release,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteSection {
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
    pub init_sql: Option<String>,
    pub mode: OpenMode,
}

impl Default for SqliteSection {
    fn default() -> Self {
        let defaults = SqliteConfig::default();
        Self {
            path: defaults.path,
            busy_timeout_ms: defaults.busy_timeout.as_millis() as u64,
            init_sql: defaults.init_sql,
            mode: defaults.mode,
        }
    }
}

impl AppConfig {
    /// Merge every layer and extract the result.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            anyhow::ensure!(path.exists(), "config file {} not found", path.display());
            figment = figment.merge(Toml::file(path));
        }
        let pool_env = Env::prefixed(ENV_PREFIX)
            .filter(|key| POOL_ENV_KEYS.iter().any(|k| key.as_str().eq_ignore_ascii_case(k)))
            .map(|key| format!("pool.{}", key.as_str().to_lowercase()).into());
        let sqlite_env = Env::prefixed(&format!("{ENV_PREFIX}SQLITE__"))
            .map(|key| format!("sqlite.{}", key.as_str().to_lowercase()).into());
        figment
            .merge(pool_env)
            .merge(sqlite_env)
            .merge(Serialized::defaults(overrides.to_layer()))
            .extract()
            .context("failed to load configuration")
    }

    /// Pool settings, validated.
    pub fn pool_config(&self) -> Result<PoolConfig> {
        let config = PoolConfig {
            name: self.pool.name.clone(),
            capacity: self.pool.capacity,
            acquire_timeout: self.pool.acquire_timeout_ms.resolve()?,
            validate_on_release: self.pool.validate_on_release,
        };
        config.validate()?;
        Ok(config)
    }

    /// SQLite connection settings.
    pub fn sqlite_config(&self) -> SqliteConfig {
        SqliteConfig {
            path: self.sqlite.path.clone(),
            busy_timeout: Duration::from_millis(self.sqlite.busy_timeout_ms),
            init_sql: self.sqlite.init_sql.clone(),
            mode: self.sqlite.mode,
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to render configuration")
    }
}

/// Flags that override file and environment settings.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// SQLite database file
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Pool name used in logs and errors
    #[arg(long)]
    pub name: Option<String>,

    /// Number of connections in the pool
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Acquire timeout in milliseconds, or "none" to wait forever
    #[arg(long, value_name = "MS")]
    pub timeout: Option<String>,

    /// Log filter directive, e.g. "loanpool=debug"
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,
}

#[derive(Serialize)]
struct Layer {
    pool: PoolLayer,
    sqlite: SqliteLayer,
    logging: LoggingLayer,
}

#[derive(Serialize)]
struct PoolLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    capacity: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    acquire_timeout_ms: Option<TimeoutSetting>,
}

#[derive(Serialize)]
struct SqliteLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
}

#[derive(Serialize)]
struct LoggingLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<String>,
}

impl Overrides {
    fn to_layer(&self) -> Layer {
        let timeout = self.timeout.as_ref().map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_or_else(|_| TimeoutSetting::Named(raw.clone()), TimeoutSetting::Millis)
        });
        Layer {
            pool: PoolLayer {
                name: self.name.clone(),
                capacity: self.capacity,
                acquire_timeout_ms: timeout,
            },
            sqlite: SqliteLayer {
                path: self.db.clone(),
            },
            logging: LoggingLayer {
                level: self.log_level.clone(),
            },
        }
    }
}
