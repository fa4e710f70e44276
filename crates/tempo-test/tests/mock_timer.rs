use std::{
    cell::{Cell, OnceCell},
    rc::Rc,
};

use tempo_test::{CallCounter, Error, MockTimer};
use tempo_timer::{Callback, Clock};

#[test]
fn sleep_does_not_service() {
    let timer = MockTimer::new(0u64);
    let cb = CallCounter::new();

    timer.schedule(5, cb.callback());
    timer.sleep(10);
    assert_eq!(cb.calls(), 0);

    timer.service().unwrap();
    assert_eq!(cb.calls(), 1);
}

#[test]
fn set_time_services() {
    let timer = MockTimer::new(0u64);
    let cb = CallCounter::new();

    timer.schedule(5, cb.callback());
    assert_eq!(timer.set_time(4).unwrap(), 0);
    assert_eq!(timer.set_time(5).unwrap(), 1);
    assert_eq!(cb.calls(), 1);
}

#[test]
#[should_panic(expected = "clock cannot go backwards")]
fn set_time_rejects_the_past() {
    let timer = MockTimer::new(10u64);
    let _ = timer.set_time(9);
}

#[test]
fn advance_jumps_to_next_event() {
    let timer = MockTimer::new(0u64);
    let cb1 = CallCounter::new();
    let cb2 = CallCounter::new();

    timer.schedule(5, cb1.callback());
    timer.schedule(3, cb2.callback());

    assert_eq!(timer.advance().unwrap(), 1);
    assert_eq!(timer.now(), 3);
    assert_eq!(cb2.calls(), 1);
    assert_eq!(cb1.calls(), 0);

    assert_eq!(timer.advance().unwrap(), 1);
    assert_eq!(timer.now(), 5);
    assert_eq!(cb1.calls(), 1);

    assert_eq!(timer.advance().unwrap(), 0);
    assert_eq!(timer.now(), 5);
}

#[test]
fn advance_until_fires_in_order_and_stops_at_target() {
    let timer = MockTimer::new(0u64);
    let cb1 = CallCounter::new();
    let cb2 = CallCounter::new();

    timer.schedule(3, cb1.callback());
    timer.schedule(5, cb2.callback());

    assert_eq!(timer.advance_until(4).unwrap(), 1);
    assert_eq!(timer.clock().now(), 4);
    assert_eq!(cb1.calls(), 1);
    assert_eq!(cb2.calls(), 0);

    assert_eq!(timer.run_for(10).unwrap(), 1);
    assert_eq!(timer.now(), 14);
    assert_eq!(cb2.calls(), 1);
}

#[test]
fn advance_until_fires_events_scheduled_by_callbacks() {
    let timer = Rc::new(MockTimer::new(0u64));
    let follow_up = CallCounter::new();

    let first = Callback::new({
        let timer = Rc::downgrade(&timer);
        let follow_up = follow_up.callback();
        move || {
            if let Some(timer) = timer.upgrade() {
                timer.schedule(2, follow_up.clone());
            }
        }
    });

    timer.schedule(1, first);
    timer.advance_until(10).unwrap();
    assert_eq!(follow_up.calls(), 1);
    assert!(timer.is_empty());
}

#[test]
fn run_to_completion_drains_timer() {
    let timer = MockTimer::new(0u64);
    let cb = CallCounter::new();

    for delay in [1, 10, 100] {
        timer.schedule(delay, cb.callback());
    }

    assert_eq!(timer.run_to_completion(10).unwrap(), 3);
    assert_eq!(cb.calls(), 3);
    assert_eq!(timer.now(), 100);
}

#[test]
fn run_to_completion_respects_iteration_limit() {
    let timer = Rc::new(MockTimer::new(0u64));
    let ping = Rc::new(OnceCell::<Callback>::new());
    let calls = Rc::new(Cell::new(0));

    let cb = Callback::new({
        let timer = Rc::downgrade(&timer);
        let ping = Rc::downgrade(&ping);
        let calls = Rc::clone(&calls);
        move || {
            calls.set(calls.get() + 1);
            if let (Some(timer), Some(ping)) = (timer.upgrade(), ping.upgrade()) {
                if let Some(cb) = ping.get() {
                    timer.schedule(1, cb.clone());
                }
            }
        }
    });
    ping.set(cb.clone()).unwrap();

    timer.schedule(1, cb);
    let error = timer.run_to_completion(5).unwrap_err();
    assert!(matches!(error, Error::IterationLimit(5)));
    assert_eq!(calls.get(), 5);
    assert_eq!(timer.len(), 1);
}

#[test]
fn wait_for_stops_when_condition_holds() {
    let timer = MockTimer::new(0u64);
    let cb = CallCounter::new();

    for delay in [5, 10, 15] {
        timer.schedule(delay, cb.callback());
    }

    timer.wait_for(|| cb.calls() >= 2, Some(100), 10).unwrap();
    assert_eq!(timer.now(), 10);
    assert_eq!(timer.len(), 1);
}

#[test]
fn wait_for_times_out() {
    let timer = MockTimer::new(0u64);
    let cb = CallCounter::new();
    timer.schedule(50, cb.callback());

    let error = timer.wait_for(|| cb.calls() > 0, Some(10), 10).unwrap_err();
    assert!(matches!(error, Error::Timeout));
    assert_eq!(timer.now(), 10);
    assert_eq!(timer.len(), 1);
}

#[test]
fn wait_for_without_pending_events() {
    let timer = MockTimer::new(0u64);
    let error = timer.wait_for(|| false, None, 10).unwrap_err();
    assert!(matches!(error, Error::NoPendingEvents));
}

#[test]
fn callback_failures_are_reported() {
    let timer = MockTimer::new(0u64);
    timer.schedule(1, Callback::fallible(|| Err(eyre::eyre!("boom"))));

    let error = timer.advance().unwrap_err();
    match error {
        Error::Timer(error) => assert_eq!(error.failures().len(), 1),
        other => panic!("unexpected error: {other}"),
    }
    assert!(timer.is_empty());
}

#[test]
fn advance_until_respects_iteration_limit() {
    let timer = Rc::new(MockTimer::new(0u64).with_max_iterations(20));
    let again = Rc::new(OnceCell::<Callback>::new());
    let calls = Rc::new(Cell::new(0));

    let cb = Callback::new({
        let timer = Rc::downgrade(&timer);
        let again = Rc::downgrade(&again);
        let calls = Rc::clone(&calls);
        move || {
            calls.set(calls.get() + 1);
            if let (Some(timer), Some(again)) = (timer.upgrade(), again.upgrade()) {
                if let Some(cb) = again.get() {
                    timer.schedule(0, cb.clone());
                }
            }
        }
    });
    again.set(cb.clone()).unwrap();

    timer.schedule(1, cb);
    let error = timer.advance_until(10).unwrap_err();
    assert!(matches!(error, Error::IterationLimit(20)));
    assert_eq!(calls.get(), 20);
    assert_eq!(timer.now(), 1);
    assert_eq!(timer.len(), 1);
}
