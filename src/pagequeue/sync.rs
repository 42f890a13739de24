//! Counting semaphore

use parking_lot::{Condvar, Mutex};

/// Counting semaphore built from a mutex-guarded count and a condvar
///
/// Signals are never lost: a `signal` with no waiter is remembered in the
/// count and satisfies the next `wait`.
#[derive(Debug, Default)]
pub struct Semaphore {
    count: Mutex<u64>,
    available: Condvar,
}

impl Semaphore {
    pub fn new(initial: u64) -> Self {
        Self {
            count: Mutex::new(initial),
            available: Condvar::new(),
        }
    }

    /// Increment the count, waking one waiter
    pub fn signal(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.available.notify_one();
    }

    /// Block until the count is positive, then decrement it
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            self.available.wait(&mut count);
        }
        *count -= 1;
    }

    pub fn count(&self) -> u64 {
        *self.count.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_signal_before_wait_is_kept() {
        let sem = Semaphore::new(0);
        sem.signal();
        sem.signal();
        assert_eq!(sem.count(), 2);

        sem.wait();
        sem.wait();
        assert_eq!(sem.count(), 0);
    }

    #[test]
    fn test_wait_blocks_until_signal() {
        let sem = Arc::new(Semaphore::new(0));
        let waiter = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || {
                for _ in 0..3 {
                    sem.wait();
                }
            })
        };

        for _ in 0..3 {
            sem.signal();
        }
        waiter.join().unwrap();
        assert_eq!(sem.count(), 0);
    }
}
