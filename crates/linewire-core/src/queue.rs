//! Thread-safe FIFO shared between a connection and its pumps.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// A mutex-guarded, unbounded FIFO queue.
///
/// Every operation holds the same lock for the duration of the call. There is
/// no blocking pop and `push` wakes nobody: consumers poll with
/// [`try_pop`](Self::try_pop).
#[derive(Debug)]
pub struct SafeQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> Default for SafeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SafeQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Append `item` to the tail.
    pub fn push(&self, item: T) {
        self.inner.lock().push_back(item);
    }

    /// Remove and return the head, or `None` if the queue is empty.
    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// Snapshot emptiness check.
    ///
    /// Under concurrent access the answer may be stale as soon as it is
    /// returned; treat it as a hint.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Number of queued items at the time of the call.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Drop every queued item, returning how many were discarded.
    pub fn clear(&self) -> usize {
        let mut guard = self.inner.lock();
        let dropped = guard.len();
        guard.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let queue = SafeQueue::new();
        queue.push("a".to_string());
        queue.push("b".to_string());
        queue.push("c".to_string());

        assert_eq!(queue.try_pop().as_deref(), Some("a"));
        assert_eq!(queue.try_pop().as_deref(), Some("b"));
        assert_eq!(queue.try_pop().as_deref(), Some("c"));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_empty_queue() {
        let queue: SafeQueue<String> = SafeQueue::default();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn test_clear_reports_dropped() {
        let queue = SafeQueue::new();
        for i in 0..5 {
            queue.push(i);
        }
        assert_eq!(queue.clear(), 5);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        let queue = Arc::new(SafeQueue::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..250 {
                        queue.push(t * 1000 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.len(), 1000);

        // Per-producer order survives interleaving
        let mut last = [None::<i32>; 4];
        while let Some(item) = queue.try_pop() {
            let producer = (item / 1000) as usize;
            if let Some(prev) = last[producer] {
                assert!(item > prev);
            }
            last[producer] = Some(item);
        }
    }

    #[test]
    fn test_single_producer_single_consumer() {
        let queue = Arc::new(SafeQueue::new());
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..500u32 {
                    queue.push(i);
                }
            })
        };

        let mut received = Vec::new();
        while received.len() < 500 {
            match queue.try_pop() {
                Some(item) => received.push(item),
                None => thread::yield_now(),
            }
        }
        producer.join().unwrap();

        assert_eq!(received, (0..500).collect::<Vec<_>>());
    }
}
