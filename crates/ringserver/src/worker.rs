//! Per-thread setup and event loop.

use std::rc::Rc;

use ringcore::constants::IO_URING_QUEUE_SIZE;
use ringcore::error::Result;
use ringcore::{rlog_info, rlog_trace};
use ringio::Ring;
use ringpool::BufferPool;
use ringtask::LocalExecutor;

use crate::accept::{ListenSocket, MultishotAccept};
use crate::handler::{handle_connection, DocRoot};

pub struct WorkerConfig {
    pub id: usize,
    pub host: String,
    pub port: u16,
    pub docroot: Rc<DocRoot>,
}

/// Everything one worker OS thread owns: its own ring, its own provided
/// buffers, its own listening socket, its own cooperative executor. None of
/// it is shared with any other worker.
pub fn run_worker(config: WorkerConfig) -> Result<()> {
    ringcore::log::set_worker_id(config.id);

    let ring = Ring::new(IO_URING_QUEUE_SIZE)?;
    ringio::install(ring);

    let pool = Rc::new(BufferPool::register_default()?);
    let listener = ListenSocket::bind(&config.host, config.port)?;
    rlog_info!("worker {} listening on {}:{}", config.id, config.host, config.port);

    let executor = Rc::new(LocalExecutor::new());
    let bgid = pool.bgid();
    let listen_fd = listener.raw_fd();

    executor.spawn(accept_loop(listen_fd, bgid, Rc::clone(&pool), config.docroot, Rc::clone(&executor)));

    while ringcore::shutdown::is_running() {
        while executor.turn() > 0 {}
        ringio::with_ring(|ring| ring.submit_and_wait(1))?;
        ringio::with_ring(|ring| {
            ring.for_each_completion(|completion| {
                rlog_trace!(
                    "completion user_data={:#x} result={} flags={:#x}",
                    completion.user_data,
                    completion.result,
                    completion.flags
                );
                let ctx = unsafe { ringcore::SubmissionContext::from_user_data(completion.user_data) };
                // A multishot submission (accept) can report more than one
                // completion for the same `user_data` in a single drained
                // batch; queueing instead of overwriting keeps every one of
                // them instead of losing all but the last.
                ctx.push_completion(completion.result, completion.flags);
                if let Some(waker) = ctx.waker.take() {
                    waker.wake();
                }
            });
        });
    }
    Ok(())
}

/// Accept loop task, spawned once per worker. Holds the only
/// `MultishotAccept` guard for this listener and spawns a fresh
/// `handle_connection` task per accepted client.
async fn accept_loop(
    listen_fd: i32,
    bgid: u16,
    pool: Rc<BufferPool>,
    docroot: Rc<DocRoot>,
    executor: Rc<LocalExecutor>,
) {
    let mut guard = MultishotAccept::new(listen_fd);
    loop {
        let fd = guard.accept().await;
        if fd < 0 {
            continue;
        }
        executor.spawn(handle_connection(fd, bgid, Rc::clone(&pool), Rc::clone(&docroot)));
    }
}
