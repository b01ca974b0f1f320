// queue.rs - Blocking queues for handing values between threads

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// A mutex-protected FIFO whose pop blocks until an item arrives.  A push
/// wakes every blocked waiter, since several threads may be parked on the
/// same queue.
pub struct BlockingQueue<T> {
    items: Mutex<VecDeque<T>>,
    ready: Condvar,
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        BlockingQueue {
            items: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        }
    }

    /// Momentary item count; another thread may change it immediately.
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&self, value: T) {
        let mut items = self.items.lock().unwrap();

        items.push_back(value);
        self.ready.notify_all();
    }

    /// Block until an item is available and take it.  There is no timeout;
    /// only a push from another thread can unblock a waiting pop.
    pub fn pop(&self) -> T {
        let mut items = self.items.lock().unwrap();

        while items.is_empty() {
            items = self.ready.wait(items).unwrap();
        }

        items.pop_front().unwrap()
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
