//! A deterministic delayed-callback timer.
//!
//! Callbacks are scheduled against an injected [`Clock`] and only ever
//! fire from inside [`Timer::service`], so the caller fully controls when
//! time advances and when callbacks run.
#![warn(clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions, clippy::ignored_unit_patterns)]

pub mod callback;
pub mod clock;
#[cfg(feature = "async")]
pub mod drive;
pub mod event;
pub mod timer;

pub use callback::{Callback, CallbackId};
pub use clock::{Clock, FnClock, ManualClock, Reading};
#[cfg(feature = "monotonic")]
pub use clock::MonotonicClock;
pub use timer::{CallbackFailure, CancelMode, Error, FailurePolicy, Timer, TimerOptions};
