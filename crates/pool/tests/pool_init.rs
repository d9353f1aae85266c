//! Eager initialization and its failure path.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use loanpool::{Error, Manager, Pool, PoolConfig};
use rstest::rstest;

#[derive(Debug, thiserror::Error)]
#[error("connection {0} refused")]
struct Refused(usize);

/// Fails the `fail_at`-th creation (0-based), counting creates and closes.
struct FailAt {
    fail_at: Option<usize>,
    created: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl Manager for FailAt {
    type Handle = usize;
    type Error = Refused;

    fn id(&self) -> &str {
        "fail-at"
    }

    fn create(&self) -> Result<usize, Refused> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        if Some(n) == self.fail_at {
            return Err(Refused(n));
        }
        Ok(n)
    }

    fn close(&self, _handle: usize) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn manager(fail_at: Option<usize>) -> (FailAt, Arc<AtomicUsize>) {
    let closed = Arc::new(AtomicUsize::new(0));
    (
        FailAt {
            fail_at,
            created: AtomicUsize::new(0),
            closed: Arc::clone(&closed),
        },
        closed,
    )
}

#[rstest]
#[case::first(4, 0)]
#[case::middle(4, 2)]
#[case::last(4, 3)]
#[case::single(1, 0)]
fn init_failure_closes_what_was_created(#[case] capacity: usize, #[case] fail_at: usize) {
    let (manager, closed) = manager(Some(fail_at));

    let err = Pool::new(manager, PoolConfig::with_capacity(capacity)).unwrap_err();

    match &err {
        Error::InitFailed {
            created,
            capacity: cap,
            ..
        } => {
            assert_eq!(*created, fail_at);
            assert_eq!(*cap, capacity);
        }
        other => panic!("expected InitFailed, got: {other:?}"),
    }
    assert_eq!(closed.load(Ordering::SeqCst), fail_at);
    assert!(!err.is_retryable());
}

#[rstest]
#[case(1)]
#[case(10)]
fn successful_init_fills_every_slot(#[case] capacity: usize) {
    let (manager, closed) = manager(None);

    let pool = Pool::new(manager, PoolConfig::with_capacity(capacity)).unwrap();

    let stats = pool.stats();
    assert_eq!(stats.capacity, capacity);
    assert_eq!(stats.idle, capacity);
    assert_eq!(stats.outstanding, 0);
    assert_eq!(stats.created, capacity as u64);
    assert!(!pool.is_closed());
    assert_eq!(closed.load(Ordering::SeqCst), 0);
}

#[test]
fn zero_capacity_is_a_configuration_error() {
    let (manager, _) = manager(None);
    let err = Pool::new(manager, PoolConfig::with_capacity(0)).unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }), "got: {err:?}");
}

#[test]
fn default_config_uses_configured_timeout() {
    let (manager, _) = manager(None);
    let pool = Pool::new(manager, PoolConfig::default()).unwrap();
    assert_eq!(pool.capacity(), 10);
    assert_eq!(pool.name(), "default");

    let handles: Vec<_> = (0..10).map(|_| pool.get().unwrap()).collect();
    assert_eq!(pool.outstanding_count(), 10);
    drop(handles);
    assert_eq!(pool.idle_count(), 10);
}
