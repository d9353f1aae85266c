//! Handle lifecycle trait
//!
//! A [`Manager`] tells the pool how to create, validate and close the
//! handles it lends out. [`FnManager`] adapts a pair of closures for callers
//! that don't need a dedicated type.

use std::fmt;

/// Creates, validates and closes pooled handles.
///
/// The pool calls [`create`](Manager::create) eagerly at construction and
/// again whenever a handle has to be replaced. It never calls `create`
/// concurrently for the same slot, but different slots may be replaced from
/// different threads at the same time.
pub trait Manager: Send + Sync + 'static {
    /// The handle type lent out by the pool.
    type Handle: Send + 'static;

    /// The error produced when a handle cannot be created.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Label used in logs, errors and metrics (e.g. "sqlite", "orders-db").
    fn id(&self) -> &str;

    /// Create one new handle.
    fn create(&self) -> Result<Self::Handle, Self::Error>;

    /// Cheap liveness check run when a handle is checked back in.
    fn is_valid(&self, _handle: &mut Self::Handle) -> bool {
        true
    }

    /// Permanently close a handle the pool is discarding.
    fn close(&self, handle: Self::Handle) {
        drop(handle);
    }
}

/// [`Manager`] built from a factory closure and a validator closure.
pub struct FnManager<F, V> {
    id: String,
    factory: F,
    validate: V,
}

impl<F, V> FnManager<F, V> {
    /// Wrap `factory` and `validate` under the given label.
    pub fn new(id: impl Into<String>, factory: F, validate: V) -> Self {
        Self {
            id: id.into(),
            factory,
            validate,
        }
    }
}

impl<F, V, T, E> Manager for FnManager<F, V>
where
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
    V: Fn(&mut T) -> bool + Send + Sync + 'static,
    T: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Handle = T;
    type Error = E;

    fn id(&self) -> &str {
        &self.id
    }

    fn create(&self) -> Result<T, E> {
        (self.factory)()
    }

    fn is_valid(&self, handle: &mut T) -> bool {
        (self.validate)(handle)
    }
}

impl<F, V> fmt::Debug for FnManager<F, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnManager").field("id", &self.id).finish()
    }
}
