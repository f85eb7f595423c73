//! In-process counting semaphore for threads sharing one store.

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};

/// Counting semaphore with a fixed capacity. `acquire` blocks while no
/// permits are left.
#[derive(Debug)]
pub(crate) struct Semaphore {
    available: Mutex<usize>,
    released: Condvar,
    capacity: usize,
}

impl Semaphore {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            available: Mutex::new(capacity),
            released: Condvar::new(),
            capacity,
        }
    }

    pub(crate) fn acquire(&self) {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
    }

    pub(crate) fn release(&self) -> Result<()> {
        let mut available = self.available.lock();
        if *available >= self.capacity {
            return Err(Error::Lock(format!(
                "semaphore released past its capacity of {}",
                self.capacity
            )));
        }
        *available += 1;
        self.released.notify_one();
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn available(&self) -> usize {
        *self.available.lock()
    }
}
