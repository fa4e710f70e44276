//! Test utilities for tempo timers.
#![warn(clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

use std::{cell::Cell, ops::Deref, rc::Rc};

use tempo_timer::{Callback, Clock, ManualClock, Reading, Timer, TimerOptions};
use thiserror::Error;

/// The default bound on advances made by [`MockTimer::advance_until`].
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// A timer with its own manually advanced clock.
///
/// Derefs to the underlying [`Timer`], so events are scheduled
/// and cancelled as usual.
#[must_use]
pub struct MockTimer<R: Reading> {
    clock: Rc<ManualClock<R>>,
    timer: Timer<Rc<ManualClock<R>>>,
    max_iterations: usize,
}

impl<R: Reading> std::fmt::Debug for MockTimer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTimer")
            .field("now", &self.clock.now())
            .field("pending", &self.timer.len())
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

impl<R: Reading> MockTimer<R> {
    /// Create a mock timer starting at the given reading.
    pub fn new(start: R) -> Self {
        Self::new_with_options(start, TimerOptions::default())
    }

    /// Create a mock timer with the given options.
    pub fn new_with_options(start: R, options: TimerOptions) -> Self {
        let clock = Rc::new(ManualClock::new(start));
        Self {
            timer: Timer::new_with_options(Rc::clone(&clock), options),
            clock,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Set the maximum amount of advances [`MockTimer::advance_until`]
    /// and [`MockTimer::run_for`] make before giving up.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// The clock driving the timer.
    #[must_use]
    pub fn clock(&self) -> &Rc<ManualClock<R>> {
        &self.clock
    }

    /// Move the clock to `time` and service the timer.
    ///
    /// # Errors
    ///
    /// Returns callback failures reported by the timer.
    ///
    /// # Panics
    ///
    /// Panics if `time` is before the current reading.
    pub fn set_time(&self, time: R) -> Result<usize, Error> {
        self.clock.set(time);
        Ok(self.timer.service()?)
    }

    /// Advance the clock without servicing the timer.
    pub fn sleep(&self, delay: R::Delay) {
        self.clock.advance(delay);
    }

    /// Move the clock to the earliest pending event and service the timer.
    ///
    /// Returns the amount of fired callbacks, zero
    /// if there are no pending events.
    ///
    /// # Errors
    ///
    /// Returns callback failures reported by the timer.
    pub fn advance(&self) -> Result<usize, Error> {
        match self.timer.next_fire_at() {
            Some(next) => self.set_time(next.max(self.clock.now())),
            None => Ok(0),
        }
    }

    /// Fire every event that is due up to `time` in order, then
    /// move the clock to `time`.
    ///
    /// Events scheduled by callbacks are fired as well
    /// if they are due before `time`.
    ///
    /// # Errors
    ///
    /// Returns callback failures reported by the timer, or
    /// [`Error::IterationLimit`] if callbacks keep scheduling due events
    /// beyond the iteration limit of the mock timer.
    pub fn advance_until(&self, time: R) -> Result<usize, Error> {
        let mut fired = 0;
        let mut iterations = 0;
        while let Some(next) = self.timer.next_fire_at() {
            if next > time {
                break;
            }
            if iterations == self.max_iterations {
                tracing::debug!(pending = self.timer.len(), "timer did not reach target");
                return Err(Error::IterationLimit(self.max_iterations));
            }
            iterations += 1;
            fired += self.advance()?;
        }
        fired += self.set_time(time.max(self.clock.now()))?;
        Ok(fired)
    }

    /// Run the timer for the given delay, see [`MockTimer::advance_until`].
    ///
    /// # Errors
    ///
    /// Returns the errors of [`MockTimer::advance_until`].
    pub fn run_for(&self, delay: R::Delay) -> Result<usize, Error> {
        self.advance_until(self.clock.now().after(delay))
    }

    /// Fire pending events until there are none left.
    ///
    /// # Errors
    ///
    /// Returns an error if a callback fails or the events
    /// are not exhausted within `max_iterations` advances.
    pub fn run_to_completion(&self, max_iterations: usize) -> Result<usize, Error> {
        let mut fired = 0;
        for _ in 0..max_iterations {
            if self.timer.is_empty() {
                return Ok(fired);
            }
            fired += self.advance()?;
        }

        if self.timer.is_empty() {
            Ok(fired)
        } else {
            tracing::debug!(pending = self.timer.len(), "timer did not complete");
            Err(Error::IterationLimit(max_iterations))
        }
    }

    /// Advance the timer event by event until `condition` holds.
    ///
    /// The clock is never moved past `timeout` from the current reading.
    ///
    /// # Errors
    ///
    /// Returns an error if a callback fails, or the condition
    /// does not hold before the timeout, the iteration limit
    /// or the pending events run out.
    pub fn wait_for(
        &self,
        mut condition: impl FnMut() -> bool,
        timeout: Option<R::Delay>,
        max_iterations: usize,
    ) -> Result<(), Error> {
        let deadline = timeout.map(|timeout| self.clock.now().after(timeout));

        for _ in 0..max_iterations {
            if condition() {
                return Ok(());
            }

            let Some(next) = self.timer.next_fire_at() else {
                return Err(Error::NoPendingEvents);
            };

            match deadline {
                Some(deadline) if next > deadline => {
                    self.set_time(deadline)?;
                    return if condition() {
                        Ok(())
                    } else {
                        Err(Error::Timeout)
                    };
                }
                _ => {
                    self.advance()?;
                }
            }
        }

        if condition() {
            Ok(())
        } else {
            Err(Error::IterationLimit(max_iterations))
        }
    }
}

impl<R: Reading> Deref for MockTimer<R> {
    type Target = Timer<Rc<ManualClock<R>>>;

    fn deref(&self) -> &Self::Target {
        &self.timer
    }
}

/// A callback that counts its invocations.
#[derive(Debug, Clone)]
pub struct CallCounter {
    callback: Callback,
    calls: Rc<Cell<usize>>,
}

impl Default for CallCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl CallCounter {
    /// Create a new counter with zero calls.
    #[must_use]
    pub fn new() -> Self {
        let calls = Rc::new(Cell::new(0));
        Self {
            callback: Callback::new({
                let calls = Rc::clone(&calls);
                move || calls.set(calls.get() + 1)
            }),
            calls,
        }
    }

    /// The counting callback, all clones share the same identity.
    pub fn callback(&self) -> Callback {
        self.callback.clone()
    }

    /// The amount of times the callback was invoked.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

/// Mock timer error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The timer reported callback failures.
    #[error(transparent)]
    Timer(#[from] tempo_timer::Error),
    /// The condition did not hold before the timeout.
    #[error("timed out waiting for condition")]
    Timeout,
    /// There were no pending events left to advance to.
    #[error("no pending events left")]
    NoPendingEvents,
    /// The iteration limit was reached.
    #[error("iteration limit of {0} reached")]
    IterationLimit(usize),
}
