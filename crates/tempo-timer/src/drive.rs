//! Periodic servicing of a timer on an async runtime.

use core::{future::Future, pin::pin, time::Duration};

use tokio::time::MissedTickBehavior;

use crate::{
    clock::Clock,
    timer::{Error, Timer},
};

/// Service the timer every `period` until `shutdown` completes.
///
/// The loop runs on the calling task, the timer itself
/// is not moved or shared. The first service happens immediately.
///
/// # Errors
///
/// Returns the first error returned by [`Timer::service`].
///
/// # Panics
///
/// Panics if `period` is zero or if not called inside a [`tokio`] runtime.
#[tracing::instrument(level = "debug", skip_all, fields(period = ?period))]
pub async fn drive<C, S>(timer: &Timer<C>, period: Duration, shutdown: S) -> Result<(), Error>
where
    C: Clock,
    S: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut shutdown = pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::debug!(pending = timer.len(), "timer driver stopped");
                return Ok(());
            }
            _ = interval.tick() => {
                let fired = timer.service()?;
                if fired > 0 {
                    tracing::trace!(fired, "serviced timer");
                }
            }
        }
    }
}
