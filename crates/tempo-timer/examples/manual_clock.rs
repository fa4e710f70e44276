use std::rc::Rc;

use tempo_timer::{Callback, Clock, ManualClock, Timer};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let clock = Rc::new(ManualClock::new(0u64));
    let timer = Timer::new(Rc::clone(&clock));

    let tick = Callback::new({
        let clock = Rc::clone(&clock);
        move || println!("tick at {}", clock.now())
    });

    timer.schedule(5, tick.clone());
    timer.schedule(3, tick.clone());
    timer.schedule(8, tick.clone());
    timer.cancel_first(&tick);

    for _ in 0..10 {
        clock.advance(1);
        if let Err(error) = timer.service() {
            eprintln!("{error}");
        }
    }
}
