//! Clock abstractions for timers.

use core::{cell::Cell, fmt::Debug, time::Duration};
use std::rc::Rc;

/// A point in time observed from a [`Clock`].
///
/// Readings are only ever compared and offset by a delay,
/// the timer never interprets them otherwise.
pub trait Reading: Copy + Ord + Debug {
    /// A non-negative offset that can be added to a reading.
    type Delay: Copy + Debug;

    /// Return the reading that is `delay` after this one.
    ///
    /// Implementations saturate instead of overflowing.
    #[must_use]
    fn after(self, delay: Self::Delay) -> Self;
}

impl Reading for u64 {
    type Delay = u64;

    fn after(self, delay: u64) -> Self {
        self.saturating_add(delay)
    }
}

impl Reading for u32 {
    type Delay = u32;

    fn after(self, delay: u32) -> Self {
        self.saturating_add(delay)
    }
}

impl Reading for Duration {
    type Delay = Duration;

    fn after(self, delay: Duration) -> Self {
        self.saturating_add(delay)
    }
}

/// A source of the current time.
///
/// The readings of a clock must never decrease.
pub trait Clock {
    /// The type of readings this clock produces.
    type Reading: Reading;

    /// Return the current reading.
    fn now(&self) -> Self::Reading;
}

impl<C: Clock + ?Sized> Clock for &C {
    type Reading = C::Reading;

    fn now(&self) -> Self::Reading {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    type Reading = C::Reading;

    fn now(&self) -> Self::Reading {
        (**self).now()
    }
}

/// A clock that is advanced manually by the caller.
///
/// Usually shared with a timer through an [`Rc`] so that
/// the caller can keep advancing it.
#[derive(Default)]
#[must_use]
pub struct ManualClock<R> {
    now: Cell<R>,
}

impl<R: Reading> Debug for ManualClock<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ManualClock")
            .field("now", &self.now.get())
            .finish()
    }
}

impl<R: Reading> ManualClock<R> {
    /// Create a new clock starting at the given reading.
    pub fn new(start: R) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Move the clock to the given reading.
    ///
    /// # Panics
    ///
    /// Panics if `reading` is before the current reading.
    pub fn set(&self, reading: R) {
        let now = self.now.get();
        assert!(
            reading >= now,
            "clock cannot go backwards: {reading:?} < {now:?}"
        );
        self.now.set(reading);
    }

    /// Advance the clock by the given delay.
    pub fn advance(&self, delay: R::Delay) {
        self.now.set(self.now.get().after(delay));
    }
}

impl<R: Reading> Clock for ManualClock<R> {
    type Reading = R;

    fn now(&self) -> R {
        self.now.get()
    }
}

/// A clock backed by a closure.
#[derive(Clone, Copy)]
pub struct FnClock<F>(pub F);

impl<F> Debug for FnClock<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("FnClock(..)")
    }
}

impl<F, R> Clock for FnClock<F>
where
    F: Fn() -> R,
    R: Reading,
{
    type Reading = R;

    fn now(&self) -> R {
        (self.0)()
    }
}

/// A monotonic clock that measures the time elapsed since its creation.
#[cfg(feature = "monotonic")]
#[derive(Clone, Copy)]
#[must_use]
pub struct MonotonicClock {
    start: minstant::Instant,
}

#[cfg(feature = "monotonic")]
impl Debug for MonotonicClock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MonotonicClock")
            .field("elapsed", &self.start.elapsed())
            .finish()
    }
}

#[cfg(feature = "monotonic")]
impl MonotonicClock {
    /// Create a new clock starting at zero.
    pub fn new() -> Self {
        Self {
            start: minstant::Instant::now(),
        }
    }
}

#[cfg(feature = "monotonic")]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "monotonic")]
impl Clock for MonotonicClock {
    type Reading = Duration;

    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}
