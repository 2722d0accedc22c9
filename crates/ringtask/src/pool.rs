//! OS thread pool: a fixed set of threads parked on a mutex+condvar FIFO,
//! each pulling one job and running it to completion before going back to
//! sleep. Each job is a plain boxed closure — in this server, one job per
//! worker, and that job is "run this OS thread's whole event loop."

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Job>>,
    condvar: Condvar,
    stopped: Mutex<bool>,
}

/// Fixed-size pool of worker threads pulling jobs from a shared FIFO, each
/// running [`thread_loop`].
pub struct ThreadPool {
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(thread_count: usize) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            stopped: Mutex::new(false),
        });

        let threads = (0..thread_count)
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || thread_loop(&shared))
            })
            .collect();

        Self { shared, threads }
    }

    pub fn size(&self) -> usize {
        self.threads.len()
    }

    /// Enqueue a job and wake one idle thread. Used exactly once per worker
    /// at startup, to hop that worker's whole event loop off the spawning
    /// thread and onto a pool thread; everything that loop subsequently
    /// awaits is driven by its own `Ring`, not by a second trip through this
    /// queue.
    pub fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        self.shared.queue.lock().unwrap().push_back(Box::new(job));
        self.shared.condvar.notify_one();
    }
}

fn thread_loop(shared: &Shared) {
    loop {
        let mut queue = shared.queue.lock().unwrap();
        loop {
            if !queue.is_empty() {
                break;
            }
            if *shared.stopped.lock().unwrap() {
                return;
            }
            queue = shared.condvar.wait(queue).unwrap();
        }
        let job = queue.pop_front();
        drop(queue);
        if let Some(job) = job {
            job();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        *self.shared.stopped.lock().unwrap() = true;
        self.shared.condvar.notify_all();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn runs_every_spawned_job() {
        let pool = ThreadPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..16 {
            let counter = Arc::clone(&counter);
            pool.spawn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(pool);
        assert_eq!(counter.load(Ordering::SeqCst), 16);
    }
}
