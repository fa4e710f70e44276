//! Scheduled event types.

use crate::{callback::Callback, clock::Reading};

/// The position of an event in the pending set.
///
/// Keys order by fire time first and schedule
/// order second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey<R> {
    /// The reading at or after which the event is due.
    pub fire_at: R,
    /// The schedule order of the event, unique per timer.
    pub sequence: u64,
}

impl<R: Reading> EventKey<R> {
    /// Whether the event is due at the given reading.
    #[must_use]
    pub fn is_due(&self, now: R) -> bool {
        self.fire_at <= now
    }
}

/// A pending callback invocation.
#[derive(Debug, Clone)]
#[must_use]
pub struct ScheduledEvent<R> {
    /// The reading at or after which the event is due.
    pub fire_at: R,
    /// The schedule order of the event, unique per timer.
    pub sequence: u64,
    /// The callback to invoke.
    pub callback: Callback,
}

impl<R: Copy> ScheduledEvent<R> {
    /// The key of the event in the pending set.
    #[must_use]
    pub fn key(&self) -> EventKey<R> {
        EventKey {
            fire_at: self.fire_at,
            sequence: self.sequence,
        }
    }
}
