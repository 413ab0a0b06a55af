//! Fixed-capacity work queue between the producer and the consumers.

use crossbeam::queue::ArrayQueue;

/// Default capacity, large enough to absorb short bursts.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100_000;

/// Bounded FIFO safe for one producer and many consumers.
///
/// Both operations are non-blocking. A full queue hands the item back so the
/// caller can retry after a backoff; an empty queue returns `None` so a
/// consumer can check its stop flag between attempts.
pub struct BoundedWorkQueue<T> {
    inner: ArrayQueue<T>,
}

impl<T> BoundedWorkQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// Try to enqueue `item`, returning it when the queue is full.
    pub fn offer(&self, item: T) -> Result<(), T> {
        self.inner.push(item)
    }

    /// Try to dequeue the oldest item.
    pub fn poll(&self) -> Option<T> {
        self.inner.pop()
    }

    /// Drop everything currently queued, returning how many items were removed.
    pub fn clear(&self) -> usize {
        let mut removed = 0;
        while self.inner.pop().is_some() {
            removed += 1;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}
