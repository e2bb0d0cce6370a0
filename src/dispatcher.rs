//! Fans expired/cancelled `(key, value)` pairs out to the user callback
//! without ever blocking the tick engine or a mutator on callback execution.
//!
//! A non-blocking unbounded channel feeds a small fixed pool of worker
//! threads. Each invocation is isolated with `catch_unwind` so one panicking
//! callback cannot poison the pool or silence later callbacks (spec §7).

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};

type Callback<V> = Arc<dyn Fn(String, V) + Send + Sync>;

pub struct Dispatcher<V> {
    sender: Sender<(String, V)>,
    workers: Vec<JoinHandle<()>>,
}

impl<V: Send + 'static> Dispatcher<V> {
    pub fn new(pool_size: usize, callback: Callback<V>) -> Self {
        let (sender, receiver): (Sender<(String, V)>, Receiver<(String, V)>) = unbounded();
        let pool_size = pool_size.max(1);
        let mut workers = Vec::with_capacity(pool_size);

        for worker_id in 0..pool_size {
            let receiver = receiver.clone();
            let callback = Arc::clone(&callback);
            let handle = thread::Builder::new()
                .name(format!("hierwheel-dispatch-{worker_id}"))
                .spawn(move || Self::run(worker_id, receiver, callback))
                .expect("failed to spawn dispatcher worker thread");
            workers.push(handle);
        }

        Self { sender, workers }
    }

    fn run(worker_id: usize, receiver: Receiver<(String, V)>, callback: Callback<V>) {
        while let Ok((key, value)) = receiver.recv() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(key, value)));
            if outcome.is_err() {
                tracing::warn!(worker_id, "timer callback panicked; isolated by dispatcher");
            }
        }
    }

    /// Hand `(key, value)` off for asynchronous delivery. Never blocks; the
    /// channel is unbounded, per the spec's non-blocking-handoff contract.
    pub fn dispatch(&self, key: String, value: V) {
        if self.sender.send((key, value)).is_err() {
            tracing::warn!("dispatcher channel closed; dropping callback delivery");
        }
    }

    /// Close the channel and join every worker. Does not cancel an
    /// in-flight callback that is already executing.
    pub fn shutdown(self) {
        let Dispatcher { sender, workers } = self;
        drop(sender);
        for handle in workers {
            let _ = handle.join();
        }
    }
}
