//! Shutdown drains idle handles, wakes waiters, and closes late returns.
//!
//! Verifies:
//! 1. Shutdown closes idle handles before returning
//! 2. Callers blocked in `acquire` are woken with `Closed`
//! 3. New acquires fail immediately, whatever their timeout
//! 4. Handles returned after shutdown are closed, not pooled
//! 5. A checkin still validating or replacing when shutdown runs closes its
//!    handle instead of pooling it

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use loanpool::{Error, Manager, Pool, PoolConfig};

// ---------------------------------------------------------------------------
// Manager that tracks closes
// ---------------------------------------------------------------------------

struct Tracking {
    closed: Arc<AtomicU32>,
}

impl Manager for Tracking {
    type Handle = String;
    type Error = Infallible;

    fn id(&self) -> &str {
        "tracked"
    }

    fn create(&self) -> Result<String, Infallible> {
        Ok("tracked-handle".to_string())
    }

    fn close(&self, _handle: String) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn tracked_pool(capacity: usize) -> (Pool<Tracking>, Arc<AtomicU32>) {
    let closed = Arc::new(AtomicU32::new(0));
    let pool = Pool::new(
        Tracking {
            closed: Arc::clone(&closed),
        },
        PoolConfig::with_capacity(capacity),
    )
    .unwrap();
    (pool, closed)
}

#[test]
fn shutdown_closes_idle_then_release_closes_outstanding() {
    let (pool, closed) = tracked_pool(3);

    let held = pool.acquire(None).unwrap();
    assert_eq!(pool.idle_count(), 2);

    pool.shutdown();

    assert_eq!(pool.idle_count(), 0, "idle must be empty once shutdown returns");
    assert_eq!(closed.load(Ordering::SeqCst), 2);
    assert_eq!(pool.outstanding_count(), 1, "checked-out handle is not force-closed");

    pool.release(held);

    assert_eq!(pool.idle_count(), 0, "late return must not refill idle");
    assert_eq!(pool.outstanding_count(), 0);
    assert_eq!(closed.load(Ordering::SeqCst), 3);
    assert_eq!(pool.stats().destroyed, 3);
}

#[test]
fn acquire_after_shutdown_fails_immediately() {
    let (pool, _) = tracked_pool(2);
    pool.shutdown();

    for timeout in [None, Some(Duration::ZERO), Some(Duration::from_secs(10))] {
        let start = Instant::now();
        let err = pool.acquire(timeout).unwrap_err();
        assert!(matches!(err, Error::Closed { .. }), "got: {err:?}");
        assert!(!err.is_retryable());
        assert!(start.elapsed() < Duration::from_millis(5));
    }
}

#[test]
fn shutdown_wakes_every_blocked_waiter() {
    let (pool, _) = tracked_pool(1);
    let _held = pool.acquire(None).unwrap();

    let waiters: Vec<_> = (0..3)
        .map(|i| {
            let pool = pool.clone();
            let timeout = if i == 0 { None } else { Some(Duration::from_secs(30)) };
            thread::spawn(move || pool.acquire(timeout).map(|_| ()))
        })
        .collect();

    let deadline = Instant::now() + Duration::from_secs(2);
    while pool.stats().waiters < 3 {
        assert!(Instant::now() < deadline, "waiters never blocked");
        thread::sleep(Duration::from_millis(1));
    }

    let start = Instant::now();
    pool.shutdown();

    for waiter in waiters {
        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(Error::Closed { .. })), "got: {result:?}");
    }
    assert!(start.elapsed() < Duration::from_millis(500));
    assert_eq!(pool.stats().waiters, 0);
}

#[test]
fn shutdown_does_not_wait_for_outstanding_handles() {
    let (pool, closed) = tracked_pool(2);
    let a = pool.acquire(None).unwrap();
    let b = pool.acquire(None).unwrap();

    let start = Instant::now();
    pool.shutdown();
    assert!(start.elapsed() < Duration::from_millis(50));
    assert!(pool.is_closed());
    assert_eq!(closed.load(Ordering::SeqCst), 0);

    drop(a);
    drop(b);
    assert_eq!(closed.load(Ordering::SeqCst), 2);
}

#[test]
fn dropping_guard_on_panicking_thread_returns_handle() {
    let (pool, _) = tracked_pool(1);

    let worker = {
        let pool = pool.clone();
        thread::spawn(move || {
            let _handle = pool.acquire(None).unwrap();
            panic!("request handler failed mid-use");
        })
    };
    assert!(worker.join().is_err());

    assert_eq!(pool.outstanding_count(), 0);
    assert_eq!(pool.idle_count(), 1);
}

// ---------------------------------------------------------------------------
// Checkin racing shutdown
// ---------------------------------------------------------------------------

/// Validator that, once armed, parks until the test lets it finish.
struct Gated {
    closed: Arc<AtomicU32>,
    armed: Arc<AtomicBool>,
    valid: bool,
    entered: Arc<Barrier>,
    proceed: Arc<Barrier>,
}

impl Manager for Gated {
    type Handle = String;
    type Error = Infallible;

    fn id(&self) -> &str {
        "gated"
    }

    fn create(&self) -> Result<String, Infallible> {
        Ok("gated-handle".to_string())
    }

    fn is_valid(&self, _handle: &mut String) -> bool {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.wait();
            self.proceed.wait();
        }
        self.valid
    }

    fn close(&self, _handle: String) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Shut the pool down while a checkin sits in validation; returns the
/// number of closes once the checkin finishes.
fn shutdown_during_checkin(valid: bool) -> u32 {
    let closed = Arc::new(AtomicU32::new(0));
    let armed = Arc::new(AtomicBool::new(false));
    let entered = Arc::new(Barrier::new(2));
    let proceed = Arc::new(Barrier::new(2));
    let pool = Pool::new(
        Gated {
            closed: Arc::clone(&closed),
            armed: Arc::clone(&armed),
            valid,
            entered: Arc::clone(&entered),
            proceed: Arc::clone(&proceed),
        },
        PoolConfig::with_capacity(2),
    )
    .unwrap();

    let held = pool.acquire(None).unwrap();
    armed.store(true, Ordering::SeqCst);
    let releaser = thread::spawn(move || drop(held));

    entered.wait();
    pool.shutdown();
    assert_eq!(pool.idle_count(), 0);
    proceed.wait();
    releaser.join().unwrap();

    let stats = pool.stats();
    assert_eq!(stats.idle, 0, "checkin must not refill a shut-down pool");
    assert_eq!(stats.outstanding, 0);
    assert_eq!(u64::from(closed.load(Ordering::SeqCst)), stats.destroyed);
    closed.load(Ordering::SeqCst)
}

#[test]
fn handle_validated_during_shutdown_is_closed() {
    // The idle handle drained by shutdown, then the returned one.
    assert_eq!(shutdown_during_checkin(true), 2);
}

#[test]
fn replacement_created_during_shutdown_is_closed() {
    // The drained idle handle, the invalid one, and its fresh replacement.
    assert_eq!(shutdown_during_checkin(false), 3);
}
