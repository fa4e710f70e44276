use std::time::Duration;

use tempo_timer::{drive::drive, Clock, MonotonicClock, Timer};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();

    let clock = MonotonicClock::new();
    let timer = Timer::new(clock);

    for i in 0..10 {
        let target = Duration::from_millis(i * 100);
        timer.schedule(target, move || {
            let now = clock.now();
            println!("target: {target:?}, latency: {:?}", now.saturating_sub(target));
        });
    }

    if let Err(error) = drive(
        &timer,
        Duration::from_millis(1),
        tokio::time::sleep(Duration::from_secs(1)),
    )
    .await
    {
        eprintln!("{error}");
    }
}
