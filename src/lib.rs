//! Hierarchical timing wheel: an in-memory scheduler that associates
//! string-valued keys with opaque payloads and a future expiration
//! deadline, firing a user-supplied callback when each deadline elapses.
//!
//! Built for workloads with many simultaneous timers — tens of thousands to
//! millions — where insertion, rescheduling, and cancellation must all run
//! in near-constant time, and where deadlines span a wide range. Based on
//! Varghese & Lauck's "Hashed and Hierarchical Timing Wheels" (1987).
//!
//! Out of scope: the callback body itself, persistence across restarts,
//! wall-clock correctness across suspend/resume (the wheel runs on a
//! monotonic clock), distribution, and metrics emission.
//!
//! ```
//! use std::time::Duration;
//! use hierwheel::{Wheel, WheelConfig};
//!
//! let wheel = Wheel::new(
//!     WheelConfig::new(Duration::from_millis(100), 8),
//!     |key, value: u32| println!("fired {key} = {value}"),
//! )
//! .unwrap();
//!
//! wheel.set("job-1", 42, Duration::from_millis(300));
//! wheel.delete("job-1");
//! wheel.stop();
//! ```

mod bucket;
mod config;
mod dispatcher;
mod entry;
mod layer;
mod slab;
mod wheel;

pub use config::{WheelConfig, WheelError};
pub use wheel::Wheel;
