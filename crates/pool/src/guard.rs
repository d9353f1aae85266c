//! RAII guard for checked-out handles

use std::time::{Duration, Instant};

use crate::manager::Manager;
use crate::pool::{Pool, Slot};

/// A handle on loan from a [`Pool`].
///
/// The guard owns the handle exclusively until it is dropped or passed to
/// [`Pool::release`]; either way the handle goes back to the pool, including
/// when the holder unwinds. Call [`mark_invalid`](Pooled::mark_invalid) after
/// an operation on the handle fails so the pool replaces it at checkin.
pub struct Pooled<M: Manager> {
    slot: Option<Slot<M::Handle>>,
    valid: bool,
    acquired_at: Instant,
    pool: Pool<M>,
}

impl<M: Manager> Pooled<M> {
    pub(crate) fn new(slot: Slot<M::Handle>, pool: Pool<M>) -> Self {
        Self {
            slot: Some(slot),
            valid: true,
            acquired_at: Instant::now(),
            pool,
        }
    }

    /// Identity of the underlying handle, unique among all handles this
    /// pool ever created. A replaced handle gets a new id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.slot().id
    }

    /// Flag the handle as broken; the pool closes and replaces it at checkin.
    pub fn mark_invalid(&mut self) {
        self.valid = false;
    }

    /// `false` once [`mark_invalid`](Pooled::mark_invalid) has been called.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// How long the handle has been checked out.
    #[must_use]
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    /// The pool this handle belongs to.
    #[must_use]
    pub fn pool(&self) -> &Pool<M> {
        &self.pool
    }

    fn slot(&self) -> &Slot<M::Handle> {
        self.slot.as_ref().expect("pooled handle used after checkin")
    }
}

impl<M: Manager> std::ops::Deref for Pooled<M> {
    type Target = M::Handle;

    fn deref(&self) -> &M::Handle {
        &self.slot().handle
    }
}

impl<M: Manager> std::ops::DerefMut for Pooled<M> {
    fn deref_mut(&mut self) -> &mut M::Handle {
        &mut self
            .slot
            .as_mut()
            .expect("pooled handle used after checkin")
            .handle
    }
}

impl<M: Manager> Drop for Pooled<M> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.pool.checkin(slot, self.valid, self.acquired_at.elapsed());
        }
    }
}

impl<M: Manager> std::fmt::Debug for Pooled<M>
where
    M::Handle: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pooled")
            .field("pool", &self.pool.name())
            .field("id", &self.slot.as_ref().map(|s| s.id))
            .field("handle", &self.slot.as_ref().map(|s| &s.handle))
            .field("valid", &self.valid)
            .finish()
    }
}
