//! `ringtask` — the concurrency substrate the server runs on: a
//! single-threaded cooperative executor for connection handlers
//! ([`LocalExecutor`]), an OS thread pool for hopping a worker's event loop
//! onto its own thread ([`ThreadPool`]), and a barrier for the main thread to
//! wait on every worker ([`SyncBarrier`]).

mod barrier;
mod executor;
mod pool;

pub use barrier::SyncBarrier;
pub use executor::LocalExecutor;
pub use pool::ThreadPool;
