use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use hierwheel::{Wheel, WheelConfig};

// Helper to find and remove from heap (simulating cancellation)
fn heap_cancel(heap: &mut BinaryHeap<Reverse<u64>>, target: u64) {
    let mut vec = heap.clone().into_vec();
    if let Some(pos) = vec.iter().position(|x| x.0 == target) {
        vec.remove(pos);
    }
    *heap = BinaryHeap::from(vec);
}

fn bench_wheel(base_ms: u64, slots: usize) -> Wheel<u64> {
    Wheel::new(
        WheelConfig::new(Duration::from_millis(base_ms), slots),
        |_key, _value: u64| {},
    )
    .unwrap()
}

fn benchmark_insert(c: &mut Criterion) {
    let n = 200_000u64;

    // Base interval large relative to the benchmark window so the tick
    // engine stays quiet and doesn't contend for the lock mid-measurement.
    let wheel = bench_wheel(50, 64);

    let mut group = c.benchmark_group("Insertion");
    group.sample_size(10);

    group.bench_function("Wheel Set 200k", |b| {
        b.iter(|| {
            for i in 0..n {
                let key = format!("req-{i}");
                let duration = Duration::from_millis(black_box(i % 10_000) + 1);
                wheel.set(key, black_box(i), duration);
            }
        })
    });

    group.bench_function("Heap Insert 200k", |b| {
        b.iter(|| {
            let mut heap = BinaryHeap::new();
            for i in 0..n {
                heap.push(Reverse(black_box(i)));
            }
        })
    });
    group.finish();

    wheel.stop();
}

fn benchmark_cancel(c: &mut Criterion) {
    let n = 10_000u64; // Smaller N because Heap cancel is SO slow

    let mut group = c.benchmark_group("Cancellation");

    group.bench_function("Wheel Delete", |b| {
        b.iter_with_setup(
            || {
                let wheel = bench_wheel(50, 64);
                let keys: Vec<String> = (0..n).map(|i| format!("req-{i}")).collect();
                for (i, key) in keys.iter().enumerate() {
                    wheel.set(key.clone(), i as u64, Duration::from_millis((i as u64 % 10_000) + 1));
                }
                (wheel, keys)
            },
            |(wheel, keys)| {
                // Measure time to cancel all of them. `wheel` (and its
                // background threads) is intentionally left running past
                // this closure rather than stopped here, so join latency
                // doesn't pollute the measured cancellation cost.
                for key in &keys {
                    wheel.delete(key);
                }
            },
        )
    });

    group.bench_function("Heap Cancel", |b| {
        b.iter_with_setup(
            || {
                let mut heap = BinaryHeap::new();
                for i in 0..n {
                    heap.push(Reverse(i));
                }
                heap
            },
            |mut heap| {
                // Simulating finding and removing specific items
                // (worst case O(N) per item).
                for i in 0..n {
                    heap_cancel(&mut heap, i);
                }
            },
        )
    });
    group.finish();
}

criterion_group!(benches, benchmark_insert, benchmark_cancel);
criterion_main!(benches);
