// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded delivery queue (C4.3).
//!
//! Hands reassembled, reordered sample chains from the receive thread to a
//! dedicated delivery thread. The queue itself does not spawn or own that
//! thread — callers drain it from wherever their delivery loop lives — but
//! it does implement the blocking/backpressure contract a dedicated
//! consumer thread relies on.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

/// How an item is handed to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueMode {
    /// Push the item and immediately wake a waiting consumer.
    Plain,
    /// Push the item without waking the consumer; the caller must
    /// eventually call [`DeliveryQueue::trigger`] to flush the batch.
    Deferred,
}

/// One entry drained by the consumer.
pub enum QueueEntry<T> {
    /// A reordered sample chain (or single sample) ready for delivery.
    Sample(T),
    /// A synchronization point: the consumer must run this before
    /// continuing to the next entry. Used to implement drain/stop.
    Callback(Box<dyn FnOnce() + Send>),
}

/// Error returned when a non-blocking enqueue finds the queue full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue is at capacity and `wait_full` is not set.
    Full,
}

struct Inner<T> {
    items: VecDeque<QueueEntry<T>>,
}

/// A bounded FIFO of [`QueueEntry`], optionally blocking producers when full.
pub struct DeliveryQueue<T> {
    capacity: usize,
    wait_full: bool,
    state: Mutex<Inner<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T> DeliveryQueue<T> {
    /// Creates a queue with the given bound. When `wait_full` is set,
    /// producers block on a full queue instead of receiving
    /// [`QueueError::Full`].
    #[must_use]
    pub fn new(capacity: usize, wait_full: bool) -> Self {
        assert!(capacity > 0, "delivery queue capacity must be positive");
        Self {
            capacity,
            wait_full,
            state: Mutex::new(Inner {
                items: VecDeque::new(),
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    fn push(&self, entry: QueueEntry<T>, wake: bool) -> Result<(), QueueError> {
        let mut guard = self.state.lock();
        loop {
            if guard.items.len() < self.capacity {
                guard.items.push_back(entry);
                break;
            }
            if self.wait_full {
                self.not_full.wait(&mut guard);
            } else {
                return Err(QueueError::Full);
            }
        }
        drop(guard);
        if wake {
            self.not_empty.notify_one();
        }
        Ok(())
    }

    /// Enqueues one sample chain, per `mode`'s wake-up semantics.
    pub fn enqueue(&self, item: T, mode: EnqueueMode) -> Result<(), QueueError> {
        let wake = matches!(mode, EnqueueMode::Plain);
        self.push(QueueEntry::Sample(item), wake)
    }

    /// Enqueues a synchronization callback, always waking the consumer so
    /// drain/stop sequences make progress promptly.
    pub fn enqueue_callback(&self, callback: Box<dyn FnOnce() + Send>) -> Result<(), QueueError> {
        self.push(QueueEntry::Callback(callback), true)
    }

    /// Wakes the consumer to flush any items enqueued with
    /// [`EnqueueMode::Deferred`].
    pub fn trigger(&self) {
        self.not_empty.notify_all();
    }

    /// Removes and returns the head entry without blocking.
    pub fn try_drain_one(&self) -> Option<QueueEntry<T>> {
        let mut guard = self.state.lock();
        let item = guard.items.pop_front();
        drop(guard);
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Blocks until an entry is available, then removes and returns it.
    pub fn drain_one_blocking(&self) -> QueueEntry<T> {
        let mut guard = self.state.lock();
        while guard.items.is_empty() {
            self.not_empty.wait(&mut guard);
        }
        let item = guard.items.pop_front().expect("checked non-empty");
        drop(guard);
        self.not_full.notify_one();
        item
    }

    /// Number of entries currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether the queue currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn fifo_order_is_preserved() {
        let q: DeliveryQueue<u32> = DeliveryQueue::new(4, false);
        q.enqueue(1, EnqueueMode::Plain).unwrap();
        q.enqueue(2, EnqueueMode::Plain).unwrap();
        q.enqueue(3, EnqueueMode::Plain).unwrap();

        for expected in [1, 2, 3] {
            match q.try_drain_one() {
                Some(QueueEntry::Sample(v)) => assert_eq!(v, expected),
                other => panic!("unexpected entry: {}", other.is_some()),
            }
        }
        assert!(q.try_drain_one().is_none());
    }

    #[test]
    fn non_blocking_queue_rejects_when_full() {
        let q: DeliveryQueue<u32> = DeliveryQueue::new(2, false);
        q.enqueue(1, EnqueueMode::Plain).unwrap();
        q.enqueue(2, EnqueueMode::Plain).unwrap();
        assert_eq!(q.enqueue(3, EnqueueMode::Plain), Err(QueueError::Full));
    }

    #[test]
    fn wait_full_queue_unblocks_once_a_slot_frees() {
        let q = Arc::new(DeliveryQueue::<u32>::new(1, true));
        q.enqueue(1, EnqueueMode::Plain).unwrap();

        let q2 = Arc::clone(&q);
        let handle = std::thread::spawn(move || {
            q2.enqueue(2, EnqueueMode::Plain).unwrap();
        });

        // Give the producer a moment to block on the full queue.
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(matches!(q.try_drain_one(), Some(QueueEntry::Sample(1))));

        handle.join().unwrap();
        assert!(matches!(q.try_drain_one(), Some(QueueEntry::Sample(2))));
    }

    #[test]
    fn callback_entry_runs_as_a_synchronization_point() {
        let q: DeliveryQueue<u32> = DeliveryQueue::new(4, false);
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = Arc::clone(&ran);

        q.enqueue(1, EnqueueMode::Plain).unwrap();
        q.enqueue_callback(Box::new(move || {
            ran2.store(1, Ordering::SeqCst);
        }))
        .unwrap();
        q.enqueue(2, EnqueueMode::Plain).unwrap();

        assert!(matches!(q.try_drain_one(), Some(QueueEntry::Sample(1))));
        match q.try_drain_one() {
            Some(QueueEntry::Callback(cb)) => cb(),
            _ => panic!("expected callback entry"),
        }
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert!(matches!(q.try_drain_one(), Some(QueueEntry::Sample(2))));
    }

    #[test]
    fn deferred_enqueue_requires_explicit_trigger_to_wake_consumer() {
        let q = Arc::new(DeliveryQueue::<u32>::new(4, false));
        let q2 = Arc::clone(&q);
        let woke = Arc::new(AtomicUsize::new(0));
        let woke2 = Arc::clone(&woke);

        let handle = std::thread::spawn(move || {
            let entry = q2.drain_one_blocking();
            woke2.store(1, Ordering::SeqCst);
            entry
        });

        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(woke.load(Ordering::SeqCst), 0);

        q.enqueue(7, EnqueueMode::Deferred).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(woke.load(Ordering::SeqCst), 0, "deferred enqueue must not wake the consumer");

        q.trigger();
        let entry = handle.join().unwrap();
        assert!(matches!(entry, QueueEntry::Sample(7)));
    }
}
