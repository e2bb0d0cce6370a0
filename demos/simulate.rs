//! Schedules a batch of timers with jittered durations, watches them fire,
//! and reports throughput. A generalization of the original crate's
//! insert-then-tick-until-drained smoke test to the key/value/callback API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hierwheel::{Wheel, WheelConfig};

fn main() {
    println!("Starting Timing Wheel Simulation...");

    let num_timers = 100_000usize;
    let fired = Arc::new(AtomicUsize::new(0));
    let fired_for_callback = Arc::clone(&fired);

    let wheel = Wheel::new(
        WheelConfig::new(Duration::from_millis(10), 64).with_channel_capacity(8),
        move |_key, _value: usize| {
            fired_for_callback.fetch_add(1, Ordering::Relaxed);
        },
    )
    .expect("valid wheel configuration");

    println!("-> Scheduling {num_timers} timers...");
    let start_insert = Instant::now();

    // Durations between 10ms and 10,000ms, simulating a spread of network
    // timeouts the way the original demo's `deadline % 10_000` did.
    for i in 0..num_timers {
        let millis = (i as u64 % 10_000) + 1;
        wheel.set(format!("Request-{i}"), i, Duration::from_millis(millis));
    }

    let insert_time = start_insert.elapsed();
    println!("   Scheduled {num_timers} timers in {insert_time:?}");
    println!(
        "   Rate: {:.2} million sets/sec",
        (num_timers as f64 / insert_time.as_secs_f64()) / 1_000_000.0
    );

    println!("\n-> Waiting for every timer to fire...");
    let start_wait = Instant::now();

    while fired.load(Ordering::Relaxed) < num_timers {
        std::thread::sleep(Duration::from_millis(50));
    }

    let wait_time = start_wait.elapsed();
    println!("   Finished in {wait_time:?}");
    println!("   Total fired: {}", fired.load(Ordering::Relaxed));

    wheel.stop();
    println!("\nSUCCESS: the wheel handled the load!");
}
