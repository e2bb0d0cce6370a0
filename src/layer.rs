//! A ring of `S` buckets with a fixed per-slot interval, plus a cursor.

use std::time::Duration;

use crate::bucket::Bucket;
use crate::slab::SlabIndex;

pub struct Layer {
    pub interval: Duration,
    pub slots: usize,
    pub cursor: usize,
    buckets: Vec<Bucket>,
}

impl Layer {
    pub fn new(interval: Duration, slots: usize) -> Self {
        let mut buckets = Vec::with_capacity(slots);
        buckets.resize_with(slots, Bucket::new);
        Self {
            interval,
            slots,
            cursor: 0,
            buckets,
        }
    }

    /// Full range this layer can address before wrapping: `S * interval`.
    pub fn range(&self) -> Duration {
        self.interval * self.slots as u32
    }

    pub fn insert(&mut self, bucket: usize, idx: SlabIndex) {
        self.buckets[bucket].insert(idx);
    }

    pub fn remove(&mut self, bucket: usize, idx: SlabIndex) {
        self.buckets[bucket].remove(idx);
    }

    /// Advance the cursor by one slot (mod `S`), returning the new position.
    /// The caller processes the bucket now under the cursor.
    pub fn advance(&mut self) -> usize {
        self.cursor = (self.cursor + 1) % self.slots;
        self.cursor
    }

    pub fn drain_bucket(&mut self, bucket: usize) -> Vec<SlabIndex> {
        self.buckets[bucket].drain()
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.drain();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_wraps_at_slot_count() {
        let mut layer = Layer::new(Duration::from_millis(100), 4);
        assert_eq!(layer.advance(), 1);
        assert_eq!(layer.advance(), 2);
        assert_eq!(layer.advance(), 3);
        assert_eq!(layer.advance(), 0);
    }

    #[test]
    fn range_is_interval_times_slots() {
        let layer = Layer::new(Duration::from_millis(100), 10);
        assert_eq!(layer.range(), Duration::from_secs(1));
    }
}
