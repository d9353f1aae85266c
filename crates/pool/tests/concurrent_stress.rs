//! Concurrent stress test for the pool.
//!
//! Twice as many worker threads as handles hammer the pool. Each worker
//! writes a unique marker into its handle, sleeps, and reads it back; any
//! handle shared between two workers would show up as a foreign marker.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use loanpool::{Manager, Pool, PoolConfig};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

const CAPACITY: usize = 4;
const WORKERS: usize = CAPACITY * 2;
const ROUNDS: usize = 50;

/// A handle whose marker cell and in-use flag are visible to the test.
struct Cell {
    index: usize,
    marker: Arc<AtomicU64>,
    in_use: Arc<AtomicBool>,
}

struct Cells {
    next: AtomicU64,
    in_use: Vec<Arc<AtomicBool>>,
}

impl Manager for Cells {
    type Handle = Cell;
    type Error = Infallible;

    fn id(&self) -> &str {
        "cells"
    }

    fn create(&self) -> Result<Cell, Infallible> {
        let index = self.next.fetch_add(1, Ordering::SeqCst) as usize;
        Ok(Cell {
            index,
            marker: Arc::new(AtomicU64::new(0)),
            in_use: Arc::clone(&self.in_use[index]),
        })
    }
}

#[test]
fn no_two_workers_ever_share_a_handle() {
    loanpool_log::try_init_test();

    let cells = Cells {
        next: AtomicU64::new(0),
        in_use: (0..CAPACITY).map(|_| Arc::new(AtomicBool::new(false))).collect(),
    };
    let pool = Pool::new(
        cells,
        PoolConfig {
            name: "stress".into(),
            capacity: CAPACITY,
            acquire_timeout: Some(Duration::from_secs(10)),
            ..Default::default()
        },
    )
    .unwrap();

    let workers: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let pool = pool.clone();
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    let cell = pool.get().expect("worker should acquire");
                    assert!(
                        !cell.in_use.swap(true, Ordering::SeqCst),
                        "handle {} handed to two workers",
                        cell.index
                    );

                    let marker = (worker * ROUNDS + round + 1) as u64;
                    cell.marker.store(marker, Ordering::SeqCst);
                    thread::sleep(Duration::from_micros(200));
                    assert_eq!(cell.marker.load(Ordering::SeqCst), marker);

                    cell.in_use.store(false, Ordering::SeqCst);
                    pool.release(cell);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker should not panic");
    }

    let stats = pool.stats();
    assert_eq!(stats.outstanding, 0);
    assert_eq!(stats.idle, CAPACITY);
    assert_eq!(stats.total_acquisitions, (WORKERS * ROUNDS) as u64);
    assert_eq!(stats.total_releases, stats.total_acquisitions);
    assert_eq!(stats.created, CAPACITY as u64, "healthy handles are never recreated");
    assert_eq!(stats.exhausted, 0);
}

#[test]
fn outstanding_never_exceeds_capacity() {
    let pool = Pool::from_fn(
        3,
        || Ok::<_, Infallible>(()),
        |_: &mut ()| true,
    )
    .unwrap();
    let peak = Arc::new(AtomicU64::new(0));
    let live = Arc::new(AtomicU64::new(0));

    let workers: Vec<_> = (0..12)
        .map(|_| {
            let pool = pool.clone();
            let peak = Arc::clone(&peak);
            let live = Arc::clone(&live);
            thread::spawn(move || {
                for _ in 0..100 {
                    let handle = pool.acquire(None).unwrap();
                    let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::yield_now();
                    live.fetch_sub(1, Ordering::SeqCst);
                    drop(handle);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(pool.idle_count(), 3);
}
