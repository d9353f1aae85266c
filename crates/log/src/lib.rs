//! # loanpool-log
//!
//! Subscriber setup for binaries and tests built on `loanpool`.
//!
//! The library crates only emit `tracing` events; this crate installs the
//! global subscriber that renders them.
//!
//! ```no_run
//! let _guard = loanpool_log::init(loanpool_log::Config::from_env()).unwrap();
//! tracing::info!("ready");
//! ```

mod builder;
mod config;
mod error;

pub use builder::{LoggerBuilder, LoggerGuard};
pub use config::{Config, Format};
pub use error::{LogError, LogResult};

/// Install the global subscriber described by `config`.
///
/// # Errors
/// See [`LoggerBuilder::build`].
pub fn init(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}

/// Install a trace-level subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
pub fn try_init_test() {
    let _ = LoggerBuilder::from_config(Config::test()).test_writer().build();
}
