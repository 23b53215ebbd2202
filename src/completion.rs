use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

enum Slot<T> {
    Empty,
    Filled(T),
    /// The reader took the value or stopped waiting.
    Closed,
}

/// Single-assignment slot bridging one writer (a worker task) to one blocked
/// reader with a deadline.
///
/// The first [`complete`](Self::complete) wins. Any later write, including one
/// that arrives after the reader timed out, is dropped.
pub struct CompletionCell<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> Default for CompletionCell<T> {
    fn default() -> Self {
        CompletionCell {
            slot: Mutex::new(Slot::Empty),
            ready: Condvar::new(),
        }
    }
}

impl<T> CompletionCell<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` unless the cell was already written or abandoned.
    /// Returns whether the value was accepted.
    pub fn complete(&self, value: T) -> bool {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Empty) {
            return false;
        }
        *slot = Slot::Filled(value);
        self.ready.notify_one();
        true
    }

    /// Block until a value arrives or `timeout` elapses. Either way the cell is
    /// closed afterwards.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<T> {
        // An unrepresentable deadline means "wait forever".
        let deadline = Instant::now().checked_add(timeout);
        let mut slot = self.slot.lock();
        loop {
            match std::mem::replace(&mut *slot, Slot::Closed) {
                Slot::Filled(value) => return Some(value),
                Slot::Closed => return None,
                Slot::Empty => *slot = Slot::Empty,
            }
            match deadline {
                Some(deadline) => {
                    if self.ready.wait_until(&mut slot, deadline).timed_out() {
                        return match std::mem::replace(&mut *slot, Slot::Closed) {
                            Slot::Filled(value) => Some(value),
                            _ => None,
                        };
                    }
                }
                None => self.ready.wait(&mut slot),
            }
        }
    }
}
