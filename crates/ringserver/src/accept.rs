//! Listening socket and its multishot-accept awaiter.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use ringcore::error::Result;
use ringcore::submission::SubmissionContext;

/// One worker's independently bound-and-listening socket. `SO_REUSEADDR` +
/// `SO_REUSEPORT` let every worker bind the same port independently.
pub struct ListenSocket {
    fd: i32,
}

impl ListenSocket {
    pub fn bind(host: &str, port: u16) -> Result<Self> {
        let fd = ringio::bind_listener(host, port)?;
        Ok(Self { fd })
    }

    pub fn raw_fd(&self) -> i32 {
        self.fd
    }
}

impl Drop for ListenSocket {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd) };
    }
}

/// Persistent multishot-accept state for one listening socket. Lives for
/// the whole lifetime of the worker's accept loop; each `.accept()` call
/// hands back a fresh, short-lived [`Future`] borrowing it, the same shape
/// as `tokio::net::TcpListener::accept`.
pub struct MultishotAccept {
    listen_fd: i32,
    ctx: SubmissionContext,
    armed: bool,
}

impl MultishotAccept {
    pub fn new(listen_fd: i32) -> Self {
        Self { listen_fd, ctx: SubmissionContext::new(), armed: false }
    }

    pub fn accept(&mut self) -> AcceptFuture<'_> {
        AcceptFuture { guard: self }
    }
}

impl Drop for MultishotAccept {
    fn drop(&mut self) {
        // Cancel the outstanding request so the kernel stops writing
        // completions into memory this guard is about to free.
        if self.armed {
            let user_data = {
                let ptr = &mut self.ctx as *mut SubmissionContext;
                ptr as u64
            };
            let _ = ringio::with_ring(|ring| ring.push_async_cancel(user_data));
            let _ = ringio::with_ring(|ring| ring.submit());
        }
    }
}

pub struct AcceptFuture<'a> {
    guard: &'a mut MultishotAccept,
}

impl Future for AcceptFuture<'_> {
    type Output = i32;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<i32> {
        let this = self.get_mut();
        this.guard.ctx.waker = Some(cx.waker().clone());

        if !this.guard.armed {
            let ctx_ptr: *mut SubmissionContext = &mut this.guard.ctx;
            ringio::with_ring(|ring| ring.push_multishot_accept(this.guard.listen_fd, unsafe { &mut *ctx_ptr }))
                .expect("submission queue full arming multishot accept");
            this.guard.armed = true;
        }

        // The queue can already hold a completion left over from the last
        // drained batch (the worker loop wakes us once per batch, not once
        // per queued completion), so check it before suspending. Every
        // `.accept().await` creates a fresh `AcceptFuture`, so the next call
        // in the accept loop drains the next queued entry immediately
        // without waiting on a new kernel completion.
        match this.guard.ctx.pop_completion() {
            Some(record) => {
                if !record.has_more() {
                    let ctx_ptr: *mut SubmissionContext = &mut this.guard.ctx;
                    ringio::with_ring(|ring| ring.push_multishot_accept(this.guard.listen_fd, unsafe { &mut *ctx_ptr }))
                        .expect("submission queue full re-arming multishot accept");
                }
                Poll::Ready(record.result)
            }
            None => Poll::Pending,
        }
    }
}
