//! Error types for pool operations
use thiserror::Error;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by a [`Manager`](crate::Manager) factory.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by [`Pool`](crate::Pool) operations.
///
/// Exhaustion and closure are ordinary runtime conditions under load or
/// during shutdown. Creation failures mean the backend is unavailable.
#[derive(Error, Debug)]
pub enum Error {
    /// Pool configuration is invalid
    #[error("Configuration error: {message}")]
    Configuration {
        /// The error message
        message: String,
    },

    /// The pool could not create its initial set of handles
    #[error(
        "Pool '{pool}' failed to initialize: created {created} of {capacity} handles"
    )]
    InitFailed {
        /// The pool identifier
        pool: String,
        /// Handles created successfully before the failure
        created: usize,
        /// Requested capacity
        capacity: usize,
        /// The factory error
        #[source]
        source: BoxError,
    },

    /// No handle became idle before the acquire deadline
    #[error("Pool '{pool}' exhausted: {outstanding}/{capacity} in use after {waited_ms}ms")]
    Exhausted {
        /// The pool identifier
        pool: String,
        /// Pool capacity
        capacity: usize,
        /// Handles checked out when the call gave up
        outstanding: usize,
        /// Other callers still waiting
        waiters: usize,
        /// How long the call waited
        waited_ms: u64,
    },

    /// The pool has been shut down
    #[error("Pool '{pool}' is closed")]
    Closed {
        /// The pool identifier
        pool: String,
    },

    /// A replacement handle could not be created
    #[error("Pool '{pool}' failed to create a handle")]
    CreateFailed {
        /// The pool identifier
        pool: String,
        /// The factory error
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Exhaustion clears as soon as a handle is released; a failed creation
    /// may succeed once the backend comes back.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Exhausted { .. } | Self::CreateFailed { .. })
    }

    /// Get the pool ID associated with this error (if any)
    #[must_use]
    pub fn pool_id(&self) -> Option<&str> {
        match self {
            Self::Configuration { .. } => None,
            Self::InitFailed { pool, .. }
            | Self::Exhausted { pool, .. }
            | Self::Closed { pool }
            | Self::CreateFailed { pool, .. } => Some(pool),
        }
    }
}
