//! Logger builder implementation

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

use crate::config::{Config, Format};
use crate::error::{LogError, LogResult};

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
    test_writer: bool,
}

/// Guard returned by [`LoggerBuilder::build`]
///
/// Keeps a handle on the installed filter so it can be swapped at runtime.
pub struct LoggerGuard {
    filter: reload::Handle<EnvFilter, Registry>,
    current: Arc<ArcSwap<String>>,
}

impl std::fmt::Debug for LoggerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerGuard")
            .field("filter", &self.current.load_full())
            .finish_non_exhaustive()
    }
}

/// Build one fmt layer with the display options from `Config`.
macro_rules! fmt_layer {
    ($kind:ident, $config:expr, $writer:expr) => {
        fmt::layer()
            .$kind()
            .with_ansi($config.ansi && !matches!($config.format, Format::Json))
            .with_target($config.target)
            .with_thread_names($config.thread_names)
            .with_writer($writer)
    };
}

impl LoggerBuilder {
    /// Create builder from config
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            test_writer: false,
        }
    }

    /// Route output through the test harness so it is captured per test.
    #[must_use]
    pub fn test_writer(mut self) -> Self {
        self.test_writer = true;
        self
    }

    /// Build and install the global subscriber
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The filter directive cannot be parsed
    /// - A global subscriber is already installed
    pub fn build(self) -> LogResult<LoggerGuard> {
        let config = self.config;
        let filter = parse_filter(&config.level)?;
        let (filter_layer, handle) = reload::Layer::new(filter);

        let writer = if self.test_writer {
            BoxMakeWriter::new(fmt::TestWriter::default())
        } else {
            BoxMakeWriter::new(std::io::stderr)
        };

        let registry = Registry::default().with(filter_layer);
        let installed = match config.format {
            Format::Pretty => registry.with(fmt_layer!(pretty, config, writer)).try_init(),
            Format::Compact => registry.with(fmt_layer!(compact, config, writer)).try_init(),
            Format::Json => registry.with(fmt_layer!(json, config, writer)).try_init(),
        };
        installed.map_err(|e| LogError::AlreadyInitialized(e.to_string()))?;

        tracing::debug!(filter = %config.level, format = ?config.format, "logger initialized");

        Ok(LoggerGuard {
            filter: handle,
            current: Arc::new(ArcSwap::from_pointee(config.level)),
        })
    }
}

impl LoggerGuard {
    /// Replace the active filter directive.
    ///
    /// # Errors
    /// Returns error if the directive cannot be parsed. The previous filter
    /// stays active in that case.
    pub fn reload(&self, directive: &str) -> LogResult<()> {
        let filter = parse_filter(directive)?;
        self.filter
            .reload(filter)
            .map_err(|e| LogError::Reload(e.to_string()))?;
        self.current.store(Arc::new(directive.to_string()));
        Ok(())
    }

    /// The filter directive currently in effect.
    #[must_use]
    pub fn current_filter(&self) -> Arc<String> {
        self.current.load_full()
    }
}

fn parse_filter(directive: &str) -> LogResult<EnvFilter> {
    EnvFilter::try_new(directive).map_err(|e| LogError::Filter {
        directive: directive.to_string(),
        reason: e.to_string(),
    })
}
