//! Bounded blocking pool.
//!
//! `Pool<M>` creates `capacity` handles up front through its [`Manager`] and
//! lends them out one caller at a time. All shared state lives behind a
//! single `parking_lot::Mutex`; callers that find no idle handle park on a
//! `Condvar` tied to that mutex until a handle is checked in, their deadline
//! passes, or the pool shuts down.
//!
//! A slot is always in exactly one place: idle in the pool, checked out by a
//! caller, or pending recreation after its replacement failed to open.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::config::PoolConfig;
use crate::error::{BoxError, Error, Result};
use crate::guard::Pooled;
use crate::manager::{FnManager, Manager};
use crate::metrics;
use crate::stats::PoolStats;

// ---------------------------------------------------------------------------
// Pool internals
// ---------------------------------------------------------------------------

/// A handle together with its identity.
pub(crate) struct Slot<H> {
    pub(crate) handle: H,
    pub(crate) id: u64,
}

/// Everything guarded by the pool lock.
struct State<H> {
    /// LIFO stack of idle handles.
    idle: Vec<Slot<H>>,
    outstanding: usize,
    /// Slots whose replacement could not be created yet.
    pending: usize,
    waiters: usize,
    closed: bool,
    /// Message of the most recent factory failure after initialization.
    last_create_error: Option<String>,
    stats: PoolStats,
}

impl<H> State<H> {
    fn snapshot(&self) -> PoolStats {
        PoolStats {
            idle: self.idle.len(),
            outstanding: self.outstanding,
            pending: self.pending,
            waiters: self.waiters,
            ..self.stats.clone()
        }
    }
}

struct Shared<M: Manager> {
    manager: M,
    config: PoolConfig,
    state: Mutex<State<M::Handle>>,
    /// Signalled when a handle becomes idle, a slot becomes pending, or the
    /// pool shuts down.
    available: Condvar,
    next_id: AtomicU64,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

impl<M: Manager> Shared<M> {
    /// Run the factory. A panic in the factory counts as a failed creation.
    fn create_slot(&self) -> std::result::Result<Slot<M::Handle>, BoxError> {
        let handle = match panic::catch_unwind(AssertUnwindSafe(|| self.manager.create())) {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => return Err(Box::new(e)),
            Err(payload) => {
                return Err(format!("factory panicked: {}", panic_message(&*payload)).into());
            }
        };
        Ok(Slot {
            handle,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// Run the validator. A panic in the validator counts as invalid.
    fn validate(&self, slot: &mut Slot<M::Handle>) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(|| self.manager.is_valid(&mut slot.handle))) {
            Ok(valid) => valid,
            Err(payload) => {
                tracing::warn!(
                    pool = %self.config.name,
                    handle = slot.id,
                    panic = %panic_message(&*payload),
                    "validator panicked; treating handle as invalid"
                );
                false
            }
        }
    }

    fn close_handle(&self, handle: M::Handle) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.manager.close(handle))) {
            tracing::warn!(
                pool = %self.config.name,
                panic = %panic_message(&*payload),
                "closing a handle panicked"
            );
        }
    }

    fn record_create_failure(&self, state: &mut State<M::Handle>, error: &BoxError) {
        state.stats.create_failures += 1;
        state.last_create_error = Some(error.to_string());
        metrics::create_failed(&self.config.name);
    }

    fn exhausted(&self, state: &mut State<M::Handle>, started: Instant) -> Error {
        state.stats.exhausted += 1;
        // A notification meant for this caller may have landed right as its
        // deadline fired. Hand it on so another waiter can take the slot.
        if !state.idle.is_empty() || state.pending > 0 {
            self.available.notify_one();
        }
        Error::Exhausted {
            pool: self.config.name.clone(),
            capacity: self.config.capacity,
            outstanding: state.outstanding,
            waiters: state.waiters,
            waited_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Report a pending slot to a caller that will not run the factory.
    fn deferred_create_failure(&self, state: &State<M::Handle>) -> Error {
        if state.waiters > 0 {
            self.available.notify_one();
        }
        let message = state
            .last_create_error
            .clone()
            .unwrap_or_else(|| "handle recreation pending".to_string());
        Error::CreateFailed {
            pool: self.config.name.clone(),
            source: message.into(),
        }
    }

    fn closed(&self) -> Error {
        Error::Closed {
            pool: self.config.name.clone(),
        }
    }
}

impl<M: Manager> Drop for Shared<M> {
    fn drop(&mut self) {
        // Last reference gone without an explicit shutdown.
        let idle = std::mem::take(&mut self.state.get_mut().idle);
        for slot in idle {
            self.close_handle(slot.handle);
        }
    }
}

// ---------------------------------------------------------------------------
// Pool<M>
// ---------------------------------------------------------------------------

/// Fixed-capacity, thread-safe, blocking handle pool.
///
/// Cloning is cheap and yields another reference to the same pool, so a
/// single pool can be constructed at startup and handed to every component
/// that needs a handle.
pub struct Pool<M: Manager> {
    shared: Arc<Shared<M>>,
}

impl<M: Manager> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: Manager> std::fmt::Debug for Pool<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("Pool")
            .field("name", &self.shared.config.name)
            .field("manager", &self.shared.manager.id())
            .field("closed", &self.is_closed())
            .field("stats", &stats)
            .finish()
    }
}

impl<F, V, T, E> Pool<FnManager<F, V>>
where
    F: Fn() -> std::result::Result<T, E> + Send + Sync + 'static,
    V: Fn(&mut T) -> bool + Send + Sync + 'static,
    T: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    /// Build a pool from a factory closure and a validator closure.
    pub fn from_fn(capacity: usize, factory: F, validate: V) -> Result<Self> {
        Self::new(
            FnManager::new("fn", factory, validate),
            PoolConfig::with_capacity(capacity),
        )
    }
}

impl<M: Manager> Pool<M> {
    /// Create a pool and eagerly open `config.capacity` handles.
    ///
    /// Handles are created one after another on the calling thread. If any
    /// creation fails, the handles opened so far are closed and
    /// [`Error::InitFailed`] reports how many had succeeded.
    pub fn new(manager: M, config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let next_id = AtomicU64::new(0);
        let mut idle = Vec::with_capacity(config.capacity);
        for _ in 0..config.capacity {
            match manager.create() {
                Ok(handle) => idle.push(Slot {
                    handle,
                    id: next_id.fetch_add(1, Ordering::Relaxed),
                }),
                Err(e) => {
                    let created = idle.len();
                    tracing::error!(
                        pool = %config.name,
                        manager = manager.id(),
                        created,
                        capacity = config.capacity,
                        error = %e,
                        "failed to create initial handles"
                    );
                    for slot in idle {
                        manager.close(slot.handle);
                    }
                    return Err(Error::InitFailed {
                        pool: config.name,
                        created,
                        capacity: config.capacity,
                        source: Box::new(e),
                    });
                }
            }
        }

        tracing::info!(
            pool = %config.name,
            manager = manager.id(),
            capacity = config.capacity,
            "pool created"
        );

        let stats = PoolStats {
            capacity: config.capacity,
            created: config.capacity as u64,
            ..PoolStats::default()
        };

        Ok(Self {
            shared: Arc::new(Shared {
                manager,
                state: Mutex::new(State {
                    idle,
                    outstanding: 0,
                    pending: 0,
                    waiters: 0,
                    closed: false,
                    last_create_error: None,
                    stats,
                }),
                config,
                available: Condvar::new(),
                next_id,
            }),
        })
    }

    /// Check out a handle, waiting at most `timeout`.
    ///
    /// - `None` waits until a handle is available or the pool shuts down.
    /// - `Some(Duration::ZERO)` never blocks; it still succeeds while a
    ///   handle is idle.
    ///
    /// The deadline is measured from entry. Once it passes the call returns
    /// [`Error::Exhausted`] and will not pick up a handle released a moment
    /// later. A shut-down pool fails with [`Error::Closed`] immediately.
    ///
    /// When nothing is idle and a slot is pending recreation, only a call
    /// without a deadline runs the factory itself (reporting
    /// [`Error::CreateFailed`] if it fails again). A call with a deadline
    /// never runs the factory: it fails with [`Error::CreateFailed`] carrying
    /// the last factory error. Pending slots are also refilled when a handle
    /// is checked in successfully, and by [`replenish`](Pool::replenish).
    pub fn acquire(&self, timeout: Option<Duration>) -> Result<Pooled<M>> {
        let shared = &*self.shared;
        let started = Instant::now();
        // A timeout too large to represent is the same as no limit.
        let deadline = timeout.and_then(|t| started.checked_add(t));

        let mut state = shared.state.lock();
        loop {
            if state.closed {
                tracing::debug!(pool = %shared.config.name, "acquire on closed pool");
                return Err(shared.closed());
            }

            if let Some(slot) = state.idle.pop() {
                state.outstanding += 1;
                state.stats.total_acquisitions += 1;
                drop(state);
                return Ok(self.lend(slot, started));
            }

            if state.pending > 0 {
                if deadline.is_none() {
                    state.pending -= 1;
                    state.outstanding += 1;
                    drop(state);
                    return self.recreate_pending(started);
                }
                let err = shared.deferred_create_failure(&state);
                drop(state);
                tracing::debug!(pool = %shared.config.name, error = %err, "slot pending recreation");
                return Err(err);
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                let err = shared.exhausted(&mut state, started);
                drop(state);
                metrics::exhausted(&shared.config.name);
                tracing::debug!(pool = %shared.config.name, error = %err, "acquire gave up");
                return Err(err);
            }

            state.waiters += 1;
            let timed_out = match deadline {
                Some(d) => shared.available.wait_until(&mut state, d).timed_out(),
                None => {
                    shared.available.wait(&mut state);
                    false
                }
            };
            state.waiters -= 1;

            if !state.closed
                && (timed_out || deadline.is_some_and(|d| Instant::now() >= d))
            {
                let err = shared.exhausted(&mut state, started);
                drop(state);
                metrics::exhausted(&shared.config.name);
                tracing::debug!(pool = %shared.config.name, error = %err, "acquire timed out");
                return Err(err);
            }
        }
    }

    /// Check out a handle using the configured default timeout.
    pub fn get(&self) -> Result<Pooled<M>> {
        self.acquire(self.shared.config.acquire_timeout)
    }

    /// Check out a handle only if one is idle right now.
    pub fn try_acquire(&self) -> Result<Pooled<M>> {
        self.acquire(Some(Duration::ZERO))
    }

    /// Return a handle to the pool.
    ///
    /// Equivalent to dropping the guard, but makes the checkin explicit at
    /// the call site.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was acquired from a different pool.
    pub fn release(&self, handle: Pooled<M>) {
        assert!(
            Arc::ptr_eq(&self.shared, &handle.pool().shared),
            "handle {} released into pool '{}' it was not acquired from",
            handle.id(),
            self.shared.config.name,
        );
        drop(handle);
    }

    /// Stop lending handles.
    ///
    /// Wakes every blocked caller with [`Error::Closed`] and closes all idle
    /// handles before returning. Handles still checked out are closed when
    /// they come back. Calling it again is a no-op.
    pub fn shutdown(&self) {
        let shared = &*self.shared;
        let (drained, outstanding) = {
            let mut state = shared.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.pending = 0;
            let drained = std::mem::take(&mut state.idle);
            state.stats.destroyed += drained.len() as u64;
            (drained, state.outstanding)
        };
        shared.available.notify_all();

        let closed = drained.len();
        for slot in drained {
            shared.close_handle(slot.handle);
        }

        tracing::info!(
            pool = %shared.config.name,
            closed,
            outstanding,
            "pool shut down"
        );
    }

    /// Retry creating handles for slots whose recreation failed.
    ///
    /// Returns how many slots were refilled. Stops at the first failure and
    /// returns it; the failed slot stays pending.
    pub fn replenish(&self) -> Result<usize> {
        let mut refilled = 0;
        loop {
            match self.refill_one() {
                None => return Ok(refilled),
                Some(Ok(())) => refilled += 1,
                Some(Err(e)) => return Err(e),
            }
        }
    }

    /// Pool name from the configuration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// The manager that creates and validates handles.
    #[must_use]
    pub fn manager(&self) -> &M {
        &self.shared.manager
    }

    /// The configuration the pool was built with.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Number of slots, fixed at construction.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.config.capacity
    }

    /// Handles currently idle.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.shared.state.lock().idle.len()
    }

    /// Handles currently checked out.
    #[must_use]
    pub fn outstanding_count(&self) -> usize {
        self.shared.state.lock().outstanding
    }

    /// Slots waiting for a replacement handle.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().pending
    }

    /// `true` once [`shutdown`](Pool::shutdown) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.shared.state.lock().snapshot()
    }

    // -- internals --

    fn lend(&self, slot: Slot<M::Handle>, started: Instant) -> Pooled<M> {
        let waited = started.elapsed();
        metrics::acquired(&self.shared.config.name, waited);
        tracing::trace!(
            pool = %self.shared.config.name,
            handle = slot.id,
            waited_us = waited.as_micros() as u64,
            "handle checked out"
        );
        Pooled::new(slot, self.clone())
    }

    /// Create a handle for a pending slot the caller has already claimed
    /// (counted as outstanding).
    fn recreate_pending(&self, started: Instant) -> Result<Pooled<M>> {
        let shared = &*self.shared;
        match shared.create_slot() {
            Ok(slot) => {
                let mut state = shared.state.lock();
                state.stats.created += 1;
                if state.closed {
                    state.outstanding -= 1;
                    state.stats.destroyed += 1;
                    drop(state);
                    shared.close_handle(slot.handle);
                    return Err(shared.closed());
                }
                state.stats.total_acquisitions += 1;
                drop(state);
                tracing::debug!(
                    pool = %shared.config.name,
                    handle = slot.id,
                    "pending slot refilled"
                );
                Ok(self.lend(slot, started))
            }
            Err(e) => {
                let mut state = shared.state.lock();
                state.outstanding -= 1;
                shared.record_create_failure(&mut state, &e);
                if !state.closed {
                    state.pending += 1;
                    // Let the next waiter retry (and report) instead of
                    // sleeping on a slot nobody will return.
                    if state.waiters > 0 {
                        shared.available.notify_one();
                    }
                }
                drop(state);
                tracing::error!(
                    pool = %shared.config.name,
                    manager = shared.manager.id(),
                    error = %e,
                    "failed to recreate pending handle"
                );
                Err(Error::CreateFailed {
                    pool: shared.config.name.clone(),
                    source: e,
                })
            }
        }
    }

    /// Claim one pending slot and try to fill it.
    ///
    /// `None` when nothing is pending. On a closed pool the result is
    /// [`Error::Closed`].
    fn refill_one(&self) -> Option<Result<()>> {
        let shared = &*self.shared;
        {
            let mut state = shared.state.lock();
            if state.closed {
                return Some(Err(shared.closed()));
            }
            if state.pending == 0 {
                return None;
            }
            state.pending -= 1;
        }

        match shared.create_slot() {
            Ok(slot) => {
                let mut state = shared.state.lock();
                state.stats.created += 1;
                if state.closed {
                    state.stats.destroyed += 1;
                    drop(state);
                    shared.close_handle(slot.handle);
                    return Some(Err(shared.closed()));
                }
                tracing::debug!(
                    pool = %shared.config.name,
                    handle = slot.id,
                    "pending slot refilled"
                );
                state.idle.push(slot);
                drop(state);
                shared.available.notify_one();
                Some(Ok(()))
            }
            Err(e) => {
                let mut state = shared.state.lock();
                shared.record_create_failure(&mut state, &e);
                if !state.closed {
                    state.pending += 1;
                }
                drop(state);
                tracing::error!(
                    pool = %shared.config.name,
                    manager = shared.manager.id(),
                    error = %e,
                    "failed to refill pending slot"
                );
                Some(Err(Error::CreateFailed {
                    pool: shared.config.name.clone(),
                    source: e,
                }))
            }
        }
    }

    /// Take a handle back from a caller. Called from `Pooled::drop`.
    pub(crate) fn checkin(&self, mut slot: Slot<M::Handle>, marked_valid: bool, held: Duration) {
        let shared = &*self.shared;
        metrics::released(&shared.config.name, held);

        {
            let mut state = shared.state.lock();
            if state.closed {
                debug_assert!(state.outstanding > 0, "checkin without checkout");
                state.outstanding -= 1;
                state.stats.total_releases += 1;
                state.stats.destroyed += 1;
                drop(state);
                tracing::trace!(
                    pool = %shared.config.name,
                    handle = slot.id,
                    "handle closed on checkin after shutdown"
                );
                shared.close_handle(slot.handle);
                return;
            }
        }

        // The releasing thread still owns the handle exclusively, so validation
        // and any replacement run without the lock. Manager panics are caught
        // so the slot is always accounted for below.
        let keep =
            marked_valid && (!shared.config.validate_on_release || shared.validate(&mut slot));

        let returned = if keep {
            Ok(slot)
        } else {
            if marked_valid {
                tracing::warn!(
                    pool = %shared.config.name,
                    handle = slot.id,
                    "handle failed validation on checkin"
                );
            }
            let old_id = slot.id;
            shared.close_handle(slot.handle);
            shared.create_slot().map(|fresh| {
                tracing::debug!(
                    pool = %shared.config.name,
                    old = old_id,
                    new = fresh.id,
                    "handle replaced"
                );
                fresh
            })
        };

        let mut state = shared.state.lock();
        debug_assert!(state.outstanding > 0, "checkin without checkout");
        state.outstanding -= 1;
        state.stats.total_releases += 1;
        if !keep {
            state.stats.destroyed += 1;
        }

        match returned {
            Ok(slot) => {
                if !keep {
                    state.stats.created += 1;
                    state.stats.recreated += 1;
                    metrics::recreated(&shared.config.name);
                }
                if state.closed {
                    // Shutdown ran while this handle was being validated.
                    state.stats.destroyed += 1;
                    drop(state);
                    shared.close_handle(slot.handle);
                    return;
                }
                tracing::trace!(pool = %shared.config.name, handle = slot.id, "handle checked in");
                state.idle.push(slot);
                let refill = state.pending > 0;
                drop(state);
                shared.available.notify_one();
                // The backend just produced a working handle; try to bring a
                // pending slot back as well.
                if refill {
                    let _ = self.refill_one();
                }
            }
            Err(e) => {
                shared.record_create_failure(&mut state, &e);
                let closed = state.closed;
                if !closed {
                    state.pending += 1;
                }
                drop(state);
                tracing::error!(
                    pool = %shared.config.name,
                    manager = shared.manager.id(),
                    error = %e,
                    "failed to replace invalid handle; slot pending recreation"
                );
                if !closed {
                    shared.available.notify_one();
                }
            }
        }
    }
}
