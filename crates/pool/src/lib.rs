//! # loanpool
//!
//! A bounded, thread-safe, blocking pool for expensive backend handles such
//! as database connections.
//!
//! The pool opens a fixed number of handles up front and lends them out to
//! one caller at a time. Callers that find nothing idle block on the calling
//! thread until a handle comes back, their timeout expires, or the pool is
//! shut down. Handles are checked on the way back in and replaced when they
//! turn out to be broken.
//!
//! ```
//! use std::time::Duration;
//!
//! use loanpool::Pool;
//!
//! let pool = Pool::from_fn(
//!     2,
//!     || Ok::<_, std::io::Error>(Vec::<u8>::new()),
//!     |_: &mut Vec<u8>| true,
//! )
//! .unwrap();
//!
//! let mut buf = pool.acquire(Some(Duration::from_millis(100))).unwrap();
//! buf.extend_from_slice(b"hello");
//! drop(buf); // back in the pool
//!
//! pool.shutdown();
//! assert!(pool.try_acquire().is_err());
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod manager;
mod metrics;
pub mod pool;
pub mod stats;

pub use config::PoolConfig;
pub use error::{BoxError, Error, Result};
pub use guard::Pooled;
pub use manager::{FnManager, Manager};
pub use pool::Pool;
pub use stats::PoolStats;
