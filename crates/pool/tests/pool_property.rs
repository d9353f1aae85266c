//! Property tests for the slot-accounting invariant.
//!
//! After any sequence of acquires, releases, invalidations and factory
//! outages, `idle + outstanding + pending == capacity`, and once the factory
//! recovers a single `replenish` brings `idle + outstanding` back to
//! `capacity`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use loanpool::{Manager, Pool, PoolConfig, Pooled};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Test manager
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
#[error("outage")]
struct Outage;

struct Flaky {
    next: AtomicU64,
    down: Arc<AtomicBool>,
}

impl Manager for Flaky {
    type Handle = u64;
    type Error = Outage;

    fn id(&self) -> &str {
        "flaky"
    }

    fn create(&self) -> Result<u64, Outage> {
        if self.down.load(Ordering::SeqCst) {
            return Err(Outage);
        }
        Ok(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Acquire,
    Release,
    ReleaseInvalid,
    ToggleOutage,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Acquire),
        2 => Just(Op::Release),
        1 => Just(Op::ReleaseInvalid),
        1 => Just(Op::ToggleOutage),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn slots_are_always_accounted_for(
        capacity in 1usize..6,
        ops in proptest::collection::vec(op(), 1..60),
    ) {
        let down = Arc::new(AtomicBool::new(false));
        let pool = Pool::new(
            Flaky { next: AtomicU64::new(0), down: Arc::clone(&down) },
            PoolConfig::with_capacity(capacity),
        )
        .unwrap();
        let mut held: Vec<Pooled<Flaky>> = Vec::new();

        for op in ops {
            match op {
                Op::Acquire => {
                    // Exhausted or CreateFailed are both fine here.
                    if let Ok(handle) = pool.try_acquire() {
                        held.push(handle);
                    }
                }
                Op::Release => {
                    if let Some(handle) = held.pop() {
                        pool.release(handle);
                    }
                }
                Op::ReleaseInvalid => {
                    if let Some(mut handle) = held.pop() {
                        handle.mark_invalid();
                        pool.release(handle);
                    }
                }
                Op::ToggleOutage => {
                    down.fetch_xor(true, Ordering::SeqCst);
                }
            }

            let stats = pool.stats();
            prop_assert_eq!(stats.outstanding, held.len());
            prop_assert!(stats.outstanding <= capacity);
            prop_assert_eq!(
                stats.accounted(), capacity,
                "idle={} outstanding={} pending={}",
                stats.idle, stats.outstanding, stats.pending,
            );
        }

        drop(held);
        down.store(false, Ordering::SeqCst);
        pool.replenish().unwrap();

        let stats = pool.stats();
        prop_assert_eq!(stats.pending, 0);
        prop_assert_eq!(stats.idle, capacity);
    }
}
