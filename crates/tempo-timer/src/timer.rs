//! A timer that fires callbacks when serviced.

use core::{cell::RefCell, fmt};
use std::collections::BTreeMap;

use thiserror::Error;

use crate::{
    callback::{Callback, CallbackId},
    clock::{Clock, Reading},
    event::{EventKey, ScheduledEvent},
};

/// What [`Timer::service`] does when a callback fails.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Invoke every due callback and report all
    /// failures after the pass.
    #[default]
    Continue,
    /// Stop at the first failure, due events that were not
    /// reached stay pending for the next call.
    Stop,
}

/// Options for a [`Timer`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TimerOptions {
    /// How callback failures are handled during a service pass.
    pub failure_policy: FailurePolicy,
}

/// Which pending events a cancellation removes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CancelMode {
    /// Only the earliest scheduled matching event.
    #[default]
    First,
    /// Every matching event.
    All,
}

impl From<bool> for CancelMode {
    fn from(cancel_all: bool) -> Self {
        if cancel_all {
            Self::All
        } else {
            Self::First
        }
    }
}

/// A timer that keeps callbacks pending until they are due
/// and fires them from [`Timer::service`].
///
/// The timer never reads time on its own or spawns anything,
/// the caller advances the clock and services the timer.
///
/// Callbacks may schedule and cancel events on the timer
/// that is firing them. The timer is not [`Sync`], access
/// from multiple threads has to be serialized by the caller.
#[must_use]
pub struct Timer<C>
where
    C: Clock,
{
    clock: C,
    options: TimerOptions,
    state: RefCell<TimerState<C::Reading>>,
}

impl<C> Timer<C>
where
    C: Clock,
{
    /// Create a new timer with the default options.
    pub fn new(clock: C) -> Self {
        Self::new_with_options(clock, TimerOptions::default())
    }

    /// Create a new timer.
    pub fn new_with_options(clock: C, options: TimerOptions) -> Self {
        Self {
            clock,
            options,
            state: RefCell::new(TimerState {
                pending: BTreeMap::new(),
                next_sequence: 0,
            }),
        }
    }

    /// The clock of the timer.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The current reading of the timer's clock.
    pub fn now(&self) -> C::Reading {
        self.clock.now()
    }

    /// Schedule a callback to fire `delay` after the current reading.
    ///
    /// Scheduling the same callback multiple times creates
    /// independent events. The callback is never invoked from here,
    /// even with a zero delay.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn schedule(&self, delay: <C::Reading as Reading>::Delay, callback: impl Into<Callback>) {
        let callback = callback.into();
        let fire_at = self.clock.now().after(delay);

        let mut state = self.state.borrow_mut();
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        tracing::trace!(
            sequence,
            ?fire_at,
            callback = %callback.id(),
            "event scheduled"
        );
        state
            .pending
            .insert(EventKey { fire_at, sequence }, callback);
    }

    /// Fire every event that is due at the current reading.
    ///
    /// Due events are fired in order of their fire time,
    /// events with equal fire times in the order they were scheduled.
    /// Each event is removed from the timer before its callback runs.
    ///
    /// The due events are determined once before any callback runs,
    /// events scheduled by callbacks are left for the next call.
    ///
    /// Returns the amount of callbacks that were invoked.
    ///
    /// # Errors
    ///
    /// Returns the callback failures, depending on the
    /// [`FailurePolicy`] of the timer.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn service(&self) -> Result<usize, Error> {
        let now = self.clock.now();
        let due = self.state.borrow().due_keys(now);

        if due.is_empty() {
            return Ok(0);
        }

        tracing::trace!(?now, count = due.len(), "events due");

        let mut fired = 0;
        let mut failures = Vec::new();

        for key in due {
            let removed = self.state.borrow_mut().pending.remove(&key);

            let Some(callback) = removed else {
                tracing::trace!(sequence = key.sequence, "event cancelled during service");
                continue;
            };

            fired += 1;
            tracing::trace!(
                sequence = key.sequence,
                fire_at = ?key.fire_at,
                callback = %callback.id(),
                "firing event"
            );

            if let Err(error) = callback.call() {
                tracing::warn!(
                    sequence = key.sequence,
                    callback = %callback.id(),
                    error = ?error,
                    "callback failed"
                );

                let failure = CallbackFailure {
                    callback: callback.id(),
                    sequence: key.sequence,
                    error,
                };

                match self.options.failure_policy {
                    FailurePolicy::Continue => failures.push(failure),
                    FailurePolicy::Stop => return Err(Error::Callback(failure)),
                }
            }
        }

        if failures.is_empty() {
            Ok(fired)
        } else {
            Err(Error::Callbacks(failures))
        }
    }

    /// Remove pending events of the given callback without firing them.
    ///
    /// With [`CancelMode::First`] only the earliest scheduled
    /// pending event is removed. Nothing happens if
    /// no event matches.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn cancel(&self, callback: impl Into<CallbackId>, mode: impl Into<CancelMode>) {
        let callback = callback.into();
        let mode = mode.into();

        let mut state = self.state.borrow_mut();
        let cancelled = match mode {
            CancelMode::First => {
                let first = state
                    .pending
                    .iter()
                    .filter(|(_, cb)| cb.id() == callback)
                    .map(|(key, _)| *key)
                    .min_by_key(|key| key.sequence);

                match first {
                    Some(key) => {
                        state.pending.remove(&key);
                        1
                    }
                    None => 0,
                }
            }
            CancelMode::All => {
                let before = state.pending.len();
                state.pending.retain(|_, cb| cb.id() != callback);
                before - state.pending.len()
            }
        };

        if cancelled == 0 {
            tracing::debug!(%callback, "no pending events to cancel");
        } else {
            tracing::trace!(%callback, cancelled, ?mode, "events cancelled");
        }
    }

    /// Cancel the earliest scheduled pending event of the callback.
    pub fn cancel_first(&self, callback: impl Into<CallbackId>) {
        self.cancel(callback, CancelMode::First);
    }

    /// Cancel every pending event of the callback.
    pub fn cancel_all(&self, callback: impl Into<CallbackId>) {
        self.cancel(callback, CancelMode::All);
    }

    /// Remove every pending event without firing it.
    pub fn clear(&self) {
        self.state.borrow_mut().pending.clear();
    }

    /// Return the amount of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Return whether there are no pending events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the fire time of the earliest pending event.
    #[must_use]
    pub fn next_fire_at(&self) -> Option<C::Reading> {
        self.state
            .borrow()
            .pending
            .keys()
            .next()
            .map(|key| key.fire_at)
    }

    /// Return the pending events in firing order.
    #[must_use]
    pub fn pending(&self) -> Vec<ScheduledEvent<C::Reading>> {
        self.state
            .borrow()
            .pending
            .iter()
            .map(|(key, callback)| ScheduledEvent {
                fire_at: key.fire_at,
                sequence: key.sequence,
                callback: callback.clone(),
            })
            .collect()
    }
}

impl<C> fmt::Debug for Timer<C>
where
    C: Clock + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Timer")
            .field("clock", &self.clock)
            .field("options", &self.options)
            .field("pending", &state.pending.len())
            .field("next_sequence", &state.next_sequence)
            .finish()
    }
}

struct TimerState<R> {
    pending: BTreeMap<EventKey<R>, Callback>,
    next_sequence: u64,
}

impl<R: Reading> TimerState<R> {
    fn due_keys(&self, now: R) -> Vec<EventKey<R>> {
        self.pending
            .keys()
            .take_while(|key| key.is_due(now))
            .copied()
            .collect()
    }
}

/// A callback that failed during [`Timer::service`].
#[derive(Debug, Error)]
#[error("callback {callback} of event #{sequence} failed: {error}")]
pub struct CallbackFailure {
    /// The failed callback.
    pub callback: CallbackId,
    /// The sequence of the fired event.
    pub sequence: u64,
    /// The error returned by the callback.
    pub error: eyre::Report,
}

/// Timer error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A callback failed and the service pass was stopped.
    #[error(transparent)]
    Callback(CallbackFailure),
    /// One or more callbacks failed during the service pass.
    #[error("{} callback(s) failed", .0.len())]
    Callbacks(Vec<CallbackFailure>),
}

impl Error {
    /// The failures contained in the error.
    #[must_use]
    pub fn failures(&self) -> &[CallbackFailure] {
        match self {
            Error::Callback(failure) => core::slice::from_ref(failure),
            Error::Callbacks(failures) => failures,
        }
    }
}
