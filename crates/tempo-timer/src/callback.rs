//! Callbacks with an explicit identity.

use core::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};
use std::rc::Rc;

static NEXT_CALLBACK_ID: AtomicU64 = AtomicU64::new(0);

/// The identity of a [`Callback`].
///
/// Every callback created with [`Callback::new`] or [`Callback::fallible`]
/// receives a distinct id, clones of a callback share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct CallbackId(u64);

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cb#{}", self.0)
    }
}

/// A zero-argument function that can be scheduled on a timer.
///
/// Callbacks are compared by identity only: two callbacks
/// are equal if one is a clone of the other, regardless
/// of what they do.
///
/// Callbacks take `&self`, use interior mutability
/// (e.g. [`Cell`](core::cell::Cell)) for state.
#[derive(Clone)]
#[must_use]
pub struct Callback {
    id: CallbackId,
    f: Rc<dyn Fn() -> eyre::Result<()>>,
}

impl Callback {
    /// Create a callback that cannot fail.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::fallible(move || {
            f();
            Ok(())
        })
    }

    /// Create a callback that can fail.
    ///
    /// Failures are reported by [`Timer::service`](crate::Timer::service).
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn() -> eyre::Result<()> + 'static,
    {
        Self {
            id: CallbackId(NEXT_CALLBACK_ID.fetch_add(1, Ordering::Relaxed)),
            f: Rc::new(f),
        }
    }

    /// The identity of this callback.
    #[must_use]
    pub fn id(&self) -> CallbackId {
        self.id
    }

    /// Invoke the callback.
    ///
    /// # Errors
    ///
    /// Returns whatever error the callback itself returns.
    pub fn call(&self) -> eyre::Result<()> {
        (self.f)()
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Callback {}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl From<&Callback> for CallbackId {
    fn from(callback: &Callback) -> Self {
        callback.id
    }
}

impl<F> From<F> for Callback
where
    F: Fn() + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}
