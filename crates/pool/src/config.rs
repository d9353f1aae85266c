//! Pool configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for a handle pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Pool label used in logs, errors and metrics
    pub name: String,
    /// Number of handles created up front; fixed for the pool's lifetime
    pub capacity: usize,
    /// Default deadline for [`Pool::get`](crate::Pool::get). `None` waits forever.
    pub acquire_timeout: Option<Duration>,
    /// Run the manager's validator on every checkin
    pub validate_on_release: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            capacity: 10,
            acquire_timeout: Some(Duration::from_millis(5000)),
            validate_on_release: true,
        }
    }
}

impl PoolConfig {
    /// Configuration with the given capacity and defaults elsewhere.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Validate pool configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::configuration("capacity must be greater than 0"));
        }
        if self.name.trim().is_empty() {
            return Err(Error::configuration("name must not be empty"));
        }
        Ok(())
    }

    /// Create configuration from environment variables
    ///
    /// Reads `LOANPOOL_NAME`, `LOANPOOL_CAPACITY`,
    /// `LOANPOOL_ACQUIRE_TIMEOUT_MS` (`none` waits forever, `0` never
    /// blocks) and `LOANPOOL_VALIDATE_ON_RELEASE`. Unset variables keep
    /// their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(name) = lookup("LOANPOOL_NAME") {
            config.name = name;
        }

        if let Some(capacity) = lookup("LOANPOOL_CAPACITY") {
            config.capacity = capacity.trim().parse().map_err(|e| {
                Error::configuration(format!("LOANPOOL_CAPACITY '{capacity}': {e}"))
            })?;
        }

        if let Some(timeout) = lookup("LOANPOOL_ACQUIRE_TIMEOUT_MS") {
            config.acquire_timeout = parse_timeout_ms(&timeout)?;
        }

        if let Some(flag) = lookup("LOANPOOL_VALIDATE_ON_RELEASE") {
            config.validate_on_release = match flag.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(Error::configuration(format!(
                        "LOANPOOL_VALIDATE_ON_RELEASE '{other}' is not a boolean"
                    )));
                }
            };
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parse a millisecond timeout where `none`/`infinite` mean no deadline.
pub fn parse_timeout_ms(raw: &str) -> Result<Option<Duration>> {
    match raw.trim().to_lowercase().as_str() {
        "none" | "infinite" | "forever" => Ok(None),
        ms => ms
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|e| Error::configuration(format!("acquire timeout '{raw}': {e}"))),
    }
}
