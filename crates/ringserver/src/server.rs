//! Top-level server assembly: build a thread pool, hop one worker event loop
//! onto each pool thread, then block until every worker returns.

use std::path::PathBuf;
use std::sync::Arc;

use ringcore::rlog_error;
use ringtask::{SyncBarrier, ThreadPool};

use crate::handler::DocRoot;
use crate::worker::{run_worker, WorkerConfig};

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub docroot: PathBuf,
    pub worker_count: usize,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16, docroot: PathBuf) -> Self {
        Self {
            host: host.into(),
            port,
            docroot,
            worker_count: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        }
    }
}

pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Spin up `worker_count` threads, each binding its own listener on the
    /// same port and running its own event loop, and block the calling
    /// thread until they all exit.
    pub fn listen(&self) {
        let thread_pool = ThreadPool::new(self.config.worker_count);
        let barrier = Arc::new(SyncBarrier::new(self.config.worker_count));

        for id in 0..self.config.worker_count {
            let host = self.config.host.clone();
            let port = self.config.port;
            // `DocRoot` wraps an `Rc`, so it can't cross the `Send` bound on
            // `ThreadPool::spawn`'s job — each worker thread builds its own
            // from the plain `PathBuf` instead of sharing one handle.
            let docroot_path = self.config.docroot.clone();
            let barrier = Arc::clone(&barrier);
            thread_pool.spawn(move || {
                let config = WorkerConfig {
                    id,
                    host,
                    port,
                    docroot: std::rc::Rc::new(DocRoot::new(docroot_path)),
                };
                if let Err(e) = run_worker(config) {
                    rlog_error!("worker {id} exited: {e}");
                }
                barrier.arrive();
            });
        }

        barrier.wait_all();
    }
}
