//! Construction-time configuration and its validation errors.

use std::time::Duration;

/// Errors that can arise only at construction time. Runtime mutators never
/// fail — see the crate-level docs for why.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelError {
    #[error("base interval must be greater than zero")]
    NonPositiveBaseInterval,
    #[error("slots per layer must be at least 2, got {0}")]
    TooFewSlots(usize),
}

/// Validated builder for a [`crate::Wheel`].
///
/// `channel_capacity` sizes the dispatcher's worker pool, not a bound on the
/// callback queue — the queue itself is always unbounded (see
/// `src/dispatcher.rs`).
#[derive(Debug, Clone)]
pub struct WheelConfig {
    base_interval: Duration,
    slots_per_layer: usize,
    channel_capacity: usize,
}

impl WheelConfig {
    pub fn new(base_interval: Duration, slots_per_layer: usize) -> Self {
        Self {
            base_interval,
            slots_per_layer,
            channel_capacity: 4,
        }
    }

    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity.max(1);
        self
    }

    pub fn base_interval(&self) -> Duration {
        self.base_interval
    }

    pub fn slots_per_layer(&self) -> usize {
        self.slots_per_layer
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    pub fn validate(&self) -> Result<(), WheelError> {
        if self.base_interval.is_zero() {
            return Err(WheelError::NonPositiveBaseInterval);
        }
        if self.slots_per_layer < 2 {
            return Err(WheelError::TooFewSlots(self.slots_per_layer));
        }
        Ok(())
    }
}
