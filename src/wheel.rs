//! The wheel core: layer stack, key index, placement/demotion algorithm, and
//! the four mutation operations (`Set`, `Move`, `Delete`, `FlushAll`), plus
//! the tick engine that drives them.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::{WheelConfig, WheelError};
use crate::dispatcher::Dispatcher;
use crate::entry::{Entry, Location};
use crate::layer::Layer;
use crate::slab::{Slab, SlabIndex};

const NUM_LAYERS: usize = 3;

/// Highest-index layer `k` with `interval_k <= d`, plus the rounds/bucket
/// placement within it. `None` if `d` is below the finest layer's interval
/// (the caller fires immediately in that case).
fn place(d: Duration, layers: &[Layer; NUM_LAYERS]) -> Option<(usize, u64, usize)> {
    for k in (0..layers.len()).rev() {
        if layers[k].interval <= d {
            let q = div_duration(d, layers[k].interval);
            let slots = layers[k].slots as u64;
            let rounds = q / slots;
            let bucket = (layers[k].cursor + (q % slots) as usize) % layers[k].slots;
            return Some((k, rounds, bucket));
        }
    }
    None
}

/// `floor(d / unit)`, computed in nanoseconds to stay exact for any duration
/// pair this wheel deals with (base interval up to the coarsest layer range).
fn div_duration(d: Duration, unit: Duration) -> u64 {
    (d.as_nanos() / unit.as_nanos()) as u64
}

struct Inner<V> {
    layers: [Layer; NUM_LAYERS],
    slab: Slab<Entry<V>>,
    index: HashMap<String, SlabIndex>,
}

impl<V> Inner<V> {
    /// Remove `key` from both the index and its bucket, if present.
    /// Invariant W1/E1: after this call `key` appears in neither.
    fn remove_key(&mut self, key: &str) -> Option<Entry<V>> {
        let idx = self.index.remove(key)?;
        let entry = self.slab.free(idx)?;
        self.layers[entry.location.layer].remove(entry.location.bucket, idx);
        Some(entry)
    }

    fn install(
        &mut self,
        key: String,
        value: V,
        layer: usize,
        bucket: usize,
        rounds: u64,
        deadline: Instant,
    ) {
        let location = Location { layer, bucket };
        let idx = self
            .slab
            .alloc(Entry::new(key.clone(), value, deadline, location, rounds));
        self.index.insert(key, idx);
        self.layers[layer].insert(bucket, idx);
    }

    /// Drain one bucket and, for each resident entry, either wait out a
    /// round, demote it to a finer layer, or fire it. Returns the entries
    /// that fired (to be handed to the dispatcher outside the lock).
    fn process_bucket(&mut self, layer: usize, bucket: usize, now: Instant) -> Vec<(String, V)> {
        let mut fired = Vec::new();

        for idx in self.layers[layer].drain_bucket(bucket) {
            let rounds = match self.slab.get(idx) {
                Some(entry) => entry.rounds,
                None => continue,
            };

            if rounds > 0 {
                if let Some(entry) = self.slab.get_mut(idx) {
                    entry.rounds -= 1;
                }
                self.layers[layer].insert(bucket, idx);
                continue;
            }

            let deadline = match self.slab.get(idx) {
                Some(entry) => entry.deadline,
                None => continue,
            };

            if deadline > now {
                self.demote(idx, deadline, now);
            } else if let Some(entry) = self.slab.get(idx) {
                let key = entry.key.clone();
                self.index.remove(&key);
                if let Some(entry) = self.slab.free(idx) {
                    fired.push((entry.key, entry.value));
                }
            }
        }

        fired
    }

    /// Entry's round is up but it still has residual time: recompute its
    /// placement against the remaining duration and reinsert, sharpening
    /// precision layer by layer. When the remainder no longer clears the
    /// finest layer's interval, the deadline still hasn't arrived — park the
    /// entry in the finest layer's next bucket, one base tick away, where
    /// `now` will have caught up to `deadline` and it fires on schedule
    /// instead of early.
    fn demote(&mut self, idx: SlabIndex, deadline: Instant, now: Instant) {
        let remaining = deadline - now;
        match place(remaining, &self.layers) {
            Some((new_layer, new_rounds, new_bucket)) => {
                if let Some(entry) = self.slab.get_mut(idx) {
                    entry.location = Location {
                        layer: new_layer,
                        bucket: new_bucket,
                    };
                    entry.rounds = new_rounds;
                }
                self.layers[new_layer].insert(new_bucket, idx);
                if let Some(entry) = self.slab.get(idx) {
                    tracing::trace!(
                        key = %entry.key,
                        new_layer,
                        new_bucket,
                        new_rounds,
                        "demoted timer entry"
                    );
                }
            }
            None => {
                let layer0 = &self.layers[0];
                let bucket = (layer0.cursor + 1) % layer0.slots;
                if let Some(entry) = self.slab.get_mut(idx) {
                    entry.location = Location { layer: 0, bucket };
                    entry.rounds = 0;
                }
                self.layers[0].insert(bucket, idx);
                if let Some(entry) = self.slab.get(idx) {
                    tracing::trace!(
                        key = %entry.key,
                        bucket,
                        "parked sub-base-interval remainder for next tick"
                    );
                }
            }
        }
    }

    /// Advance one base tick: odometer-carry cascading across layers,
    /// processing the bucket newly exposed under each layer that carries.
    fn tick(&mut self) -> Vec<(String, V)> {
        let now = Instant::now();
        let prior_cursors: Vec<usize> = self.layers.iter().map(|l| l.cursor).collect();

        let mut fired = Vec::new();

        let cursor0 = self.layers[0].advance();
        fired.extend(self.process_bucket(0, cursor0, now));

        for k in 1..self.layers.len() {
            if prior_cursors[k - 1] == self.layers[k - 1].slots - 1 {
                let cursor_k = self.layers[k].advance();
                fired.extend(self.process_bucket(k, cursor_k, now));
            }
        }

        tracing::trace!(
            cursor0 = self.layers[0].cursor,
            cursor1 = self.layers[1].cursor,
            cursor2 = self.layers[2].cursor,
            fired = fired.len(),
            "tick"
        );

        fired
    }
}

/// A running hierarchical timing wheel. Cheap to share: clone the `Arc` you
/// wrap it in (or hand out `&Wheel` to cooperating threads) — every mutator
/// takes `&self`.
pub struct Wheel<V> {
    inner: Arc<Mutex<Inner<V>>>,
    dispatcher: Arc<Dispatcher<V>>,
    running: Arc<AtomicBool>,
    tick_handle: Option<JoinHandle<()>>,
}

impl<V> Wheel<V>
where
    V: Send + 'static,
{
    /// Validate `config`, build the three layers (`B`, `B*S`, `B*S^2`),
    /// spawn the tick engine and the dispatcher pool, and return a running
    /// wheel.
    pub fn new<F>(config: WheelConfig, callback: F) -> Result<Self, WheelError>
    where
        F: Fn(String, V) + Send + Sync + 'static,
    {
        config.validate()?;

        let base_interval = config.base_interval();
        let slots = config.slots_per_layer();
        let layers = [
            Layer::new(base_interval, slots),
            Layer::new(base_interval * slots as u32, slots),
            Layer::new(base_interval * slots as u32 * slots as u32, slots),
        ];

        tracing::debug!(
            base_interval = ?base_interval,
            slots_per_layer = slots,
            layer1_interval = ?layers[1].interval,
            layer2_interval = ?layers[2].interval,
            "constructing hierarchical timing wheel"
        );

        let inner = Arc::new(Mutex::new(Inner {
            layers,
            slab: Slab::new(),
            index: HashMap::new(),
        }));

        let dispatcher = Arc::new(Dispatcher::new(config.channel_capacity(), Arc::new(callback)));
        let running = Arc::new(AtomicBool::new(true));

        let tick_handle = {
            let inner = Arc::clone(&inner);
            let dispatcher = Arc::clone(&dispatcher);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("hierwheel-tick".to_string())
                .spawn(move || Self::run_tick_engine(inner, dispatcher, running, base_interval))
                .expect("failed to spawn tick engine thread")
        };

        Ok(Self {
            inner,
            dispatcher,
            running,
            tick_handle: Some(tick_handle),
        })
    }

    fn run_tick_engine(
        inner: Arc<Mutex<Inner<V>>>,
        dispatcher: Arc<Dispatcher<V>>,
        running: Arc<AtomicBool>,
        base_interval: Duration,
    ) {
        while running.load(Ordering::Acquire) {
            thread::sleep(base_interval);
            if !running.load(Ordering::Acquire) {
                break;
            }
            let fired = inner.lock().tick();
            for (key, value) in fired {
                dispatcher.dispatch(key, value);
            }
        }
    }

    /// Schedule or replace `key`. Fires immediately (via the dispatcher, not
    /// synchronously) if `duration` is zero or too small to place in any
    /// layer.
    pub fn set(&self, key: impl Into<String>, value: V, duration: Duration) {
        let key = key.into();
        let mut guard = self.inner.lock();
        guard.remove_key(&key);

        let placement = if duration.is_zero() {
            None
        } else {
            place(duration, &guard.layers)
        };

        match placement {
            Some((layer, rounds, bucket)) => {
                let deadline = Instant::now() + duration;
                guard.install(key, value, layer, bucket, rounds, deadline);
            }
            None => {
                drop(guard);
                self.dispatcher.dispatch(key, value);
            }
        }
    }

    /// Reschedule an existing key. No-op if `key` is absent — this is a
    /// rescheduling primitive, not an upsert.
    pub fn mv(&self, key: &str, duration: Duration) {
        let mut guard = self.inner.lock();

        let idx = match guard.index.get(key).copied() {
            Some(idx) => idx,
            None => return,
        };
        let location = match guard.slab.get(idx) {
            Some(entry) => entry.location,
            None => return,
        };
        guard.layers[location.layer].remove(location.bucket, idx);

        let placement = if duration.is_zero() {
            None
        } else {
            place(duration, &guard.layers)
        };

        match placement {
            Some((layer, rounds, bucket)) => {
                let deadline = Instant::now() + duration;
                if let Some(entry) = guard.slab.get_mut(idx) {
                    entry.deadline = deadline;
                    entry.rounds = rounds;
                    entry.location = Location { layer, bucket };
                }
                guard.layers[layer].insert(bucket, idx);
            }
            None => {
                guard.index.remove(key);
                if let Some(entry) = guard.slab.free(idx) {
                    drop(guard);
                    self.dispatcher.dispatch(entry.key, entry.value);
                }
            }
        }
    }

    /// Remove a scheduled key. No callback fires. Idempotent: a no-op if
    /// `key` is absent.
    pub fn delete(&self, key: &str) {
        self.inner.lock().remove_key(key);
    }

    /// Remove every scheduled entry without firing any callback.
    pub fn flush_all(&self) {
        let mut guard = self.inner.lock();
        guard.index.clear();
        for layer in &mut guard.layers {
            layer.clear();
        }
        guard.slab = Slab::new();
    }

    /// Halt the tick engine and join the dispatcher's worker pool. Pending
    /// entries are abandoned, not fired; callbacks already handed to the
    /// dispatcher are not cancelled.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.tick_handle.take() {
            let _ = handle.join();
        }
        match Arc::try_unwrap(self.dispatcher) {
            Ok(dispatcher) => dispatcher.shutdown(),
            Err(_) => tracing::warn!(
                "dispatcher still has outstanding references at stop; \
                 worker pool will drain once they drop"
            ),
        }
    }
}
