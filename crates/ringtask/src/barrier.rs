//! A countdown barrier: one `SyncBarrier` is shared by every worker, and the
//! main thread blocks on it once, waking only after the last worker counts
//! down.

use std::sync::{Condvar, Mutex};

pub struct SyncBarrier {
    remaining: Mutex<usize>,
    condvar: Condvar,
}

impl SyncBarrier {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            condvar: Condvar::new(),
        }
    }

    /// Called by a worker when its event loop returns.
    pub fn arrive(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.condvar.notify_all();
        }
    }

    /// Block until every worker has called [`arrive`].
    pub fn wait_all(&self) {
        let guard = self.remaining.lock().unwrap();
        let _ = self
            .condvar
            .wait_while(guard, |remaining| *remaining > 0)
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn wait_all_blocks_until_every_arrival() {
        let barrier = Arc::new(SyncBarrier::new(3));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || barrier.arrive())
            })
            .collect();
        barrier.wait_all();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
