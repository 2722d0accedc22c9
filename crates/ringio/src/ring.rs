//! The `Ring` facade itself: a submit/poll-completions dispatch over a
//! handful of opcodes this server needs — multishot accept, buffer-select
//! recv, send, splice, and cancel.

use std::io;

use io_uring::{cqueue, opcode, squeue, types, IoUring};

use ringcore::constants::SOCKET_LISTEN_QUEUE_SIZE;
use ringcore::error::{setup_errno, Result, RingError};
use ringcore::submission::SubmissionContext;

use crate::bufring::BufRing;

/// One CQE, flattened out of the ring's completion queue before any
/// submission-side callback runs — see [`Ring::for_each_completion`].
pub struct Completion {
    pub user_data: u64,
    pub result: i32,
    pub flags: u32,
}

/// Thin wrapper over [`io_uring::IoUring`]. One instance lives per worker
/// thread, installed via [`crate::install`] and reached through
/// [`crate::with_ring`] — never held across an `.await`.
pub struct Ring {
    io_uring: IoUring,
    buf_ring: Option<BufRing>,
}

impl Ring {
    pub fn new(entries: u32) -> Result<Self> {
        let io_uring = IoUring::builder()
            .build(entries)
            .map_err(|e| RingError::RingSetup(e.raw_os_error().unwrap_or(0)))?;
        Ok(Self { io_uring, buf_ring: None })
    }

    /// Register and publish `count` buffers of `buf_len` bytes each under
    /// `bgid`. `storage` is the backing memory owned by `ringpool`; this
    /// only registers the kernel-visible ring of descriptors pointing into
    /// it.
    ///
    /// # Safety
    /// `storage` must remain valid and unmoved for as long as the buffer
    /// ring is registered.
    pub unsafe fn register_buffer_ring(
        &mut self,
        bgid: u16,
        ring_entries: u16,
        storage: &[(u64, u32)],
    ) -> Result<()> {
        let mut buf_ring = BufRing::allocate(ring_entries, bgid)?;
        for (buf_id, &(addr, len)) in storage.iter().enumerate() {
            buf_ring.add_buffer(addr, len, buf_id as u16);
        }
        self.io_uring
            .submitter()
            .register_buf_ring(buf_ring.ring_addr(), ring_entries, bgid)
            .map_err(|e| RingError::RingSetup(e.raw_os_error().unwrap_or(0)))?;
        self.buf_ring = Some(buf_ring);
        Ok(())
    }

    /// Re-publish a single buffer back to the kernel once the application is
    /// done reading it.
    ///
    /// # Safety
    /// `addr`/`len` must describe the same backing storage originally passed
    /// to [`Self::register_buffer_ring`] for this `buf_id`.
    pub unsafe fn add_buffer(&mut self, addr: u64, len: u32, buf_id: u16) {
        if let Some(buf_ring) = self.buf_ring.as_mut() {
            buf_ring.add_buffer(addr, len, buf_id);
        }
    }

    fn push(&mut self, entry: squeue::Entry) -> Result<()> {
        unsafe {
            self.io_uring
                .submission()
                .push(&entry)
                .map_err(|_| RingError::RingFull)
        }
    }

    pub fn push_multishot_accept(&mut self, listen_fd: i32, ctx: &mut SubmissionContext) -> Result<()> {
        let entry = opcode::AcceptMulti::new(types::Fd(listen_fd))
            .build()
            .user_data(ctx.as_user_data());
        self.push(entry)
    }

    pub fn push_recv_buf_select(&mut self, fd: i32, bgid: u16, ctx: &mut SubmissionContext) -> Result<()> {
        let entry = opcode::Recv::new(types::Fd(fd), std::ptr::null_mut(), 0)
            .buf_group(bgid)
            .build()
            .flags(squeue::Flags::BUFFER_SELECT)
            .user_data(ctx.as_user_data());
        self.push(entry)
    }

    pub fn push_send(&mut self, fd: i32, buf: &[u8], ctx: &mut SubmissionContext) -> Result<()> {
        let entry = opcode::Send::new(types::Fd(fd), buf.as_ptr(), buf.len() as u32)
            .build()
            .user_data(ctx.as_user_data());
        self.push(entry)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn push_splice(
        &mut self,
        fd_in: i32,
        off_in: i64,
        fd_out: i32,
        off_out: i64,
        len: u32,
        ctx: &mut SubmissionContext,
    ) -> Result<()> {
        let entry = opcode::Splice::new(
            types::Fd(fd_in),
            off_in,
            types::Fd(fd_out),
            off_out,
            len,
        )
        .build()
        .user_data(ctx.as_user_data());
        self.push(entry)
    }

    pub fn push_async_cancel(&mut self, target_user_data: u64) -> Result<()> {
        let entry = opcode::AsyncCancel::new(target_user_data)
            .build()
            .user_data(u64::MAX);
        self.push(entry)
    }

    pub fn submit_and_wait(&mut self, want: usize) -> Result<usize> {
        self.io_uring
            .submit_and_wait(want)
            .map_err(|e| RingError::Submit(e.raw_os_error().unwrap_or(0)))
    }

    pub fn submit(&mut self) -> Result<usize> {
        self.io_uring
            .submit()
            .map_err(|e| RingError::Submit(e.raw_os_error().unwrap_or(0)))
    }

    /// Drain every pending completion into an owned buffer before invoking
    /// `f` on each one. The copy-then-iterate split keeps the completion
    /// queue borrow from overlapping `f`'s own (quite likely) resubmission
    /// of new SQEs — pushing while still borrowing the CQE iterator would
    /// not compile.
    pub fn for_each_completion(&mut self, mut f: impl FnMut(Completion)) {
        let mut batch: Vec<Completion> = Vec::new();
        {
            let mut cq = self.io_uring.completion();
            cq.sync();
            for cqe in &mut cq {
                batch.push(Completion {
                    user_data: cqe.user_data(),
                    result: cqe.result(),
                    flags: cqueue::buffer_select(cqe.flags())
                        .map(|bid| (bid as u32) << ringcore::submission::CQE_BUFFER_SHIFT)
                        .unwrap_or(0)
                        | raw_flags(&cqe),
                });
            }
        }
        for completion in batch {
            f(completion);
        }
    }
}

fn raw_flags(cqe: &cqueue::Entry) -> u32 {
    let mut flags = 0u32;
    if cqueue::more(cqe.flags()) {
        flags |= ringcore::submission::CQE_F_MORE;
    }
    if cqueue::buffer_select(cqe.flags()).is_some() {
        flags |= ringcore::submission::CQE_F_BUFFER;
    }
    flags
}

/// Backlog used by every listening socket the server opens.
pub fn default_listen_backlog() -> i32 {
    SOCKET_LISTEN_QUEUE_SIZE as i32
}

/// `socket()` + `SO_REUSEADDR`/`SO_REUSEPORT` + `bind()` + `listen()` for one
/// worker's independent listening socket — needed because N worker threads
/// all listen on the same port.
pub fn bind_listener(host: &str, port: u16) -> Result<i32> {
    let addr = resolve_passive(host, port)?;
    unsafe {
        let fd = libc::socket(addr.ss_family(), libc::SOCK_STREAM, 0);
        if fd < 0 {
            return Err(setup_errno("socket"));
        }
        let optval: libc::c_int = 1;
        for opt in [libc::SO_REUSEADDR, libc::SO_REUSEPORT] {
            if libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                opt,
                &optval as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as u32,
            ) < 0
            {
                let err = setup_errno("setsockopt");
                libc::close(fd);
                return Err(err);
            }
        }
        if libc::bind(fd, addr.as_sockaddr(), addr.len()) < 0 {
            let err = setup_errno("bind");
            libc::close(fd);
            return Err(err);
        }
        if libc::listen(fd, default_listen_backlog()) < 0 {
            let err = setup_errno("listen");
            libc::close(fd);
            return Err(err);
        }
        Ok(fd)
    }
}

/// A resolved passive (bind-side) socket address, either IPv4 or IPv6.
enum ResolvedAddr {
    V4(libc::sockaddr_in),
    V6(libc::sockaddr_in6),
}

impl ResolvedAddr {
    fn ss_family(&self) -> i32 {
        match self {
            ResolvedAddr::V4(_) => libc::AF_INET,
            ResolvedAddr::V6(_) => libc::AF_INET6,
        }
    }

    fn as_sockaddr(&self) -> *const libc::sockaddr {
        match self {
            ResolvedAddr::V4(a) => a as *const _ as *const libc::sockaddr,
            ResolvedAddr::V6(a) => a as *const _ as *const libc::sockaddr,
        }
    }

    fn len(&self) -> libc::socklen_t {
        match self {
            ResolvedAddr::V4(_) => std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            ResolvedAddr::V6(_) => std::mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t,
        }
    }
}

fn resolve_passive(host: &str, port: u16) -> Result<ResolvedAddr> {
    use std::ffi::CString;
    use std::ptr;

    let host_c = if host.is_empty() {
        None
    } else {
        Some(CString::new(host).map_err(|_| RingError::Setup("resolve", libc::EINVAL))?)
    };
    let port_c = CString::new(port.to_string()).unwrap();

    let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
    hints.ai_family = libc::AF_UNSPEC;
    hints.ai_socktype = libc::SOCK_STREAM;
    hints.ai_flags = if host_c.is_none() { libc::AI_PASSIVE } else { 0 };

    let mut res: *mut libc::addrinfo = ptr::null_mut();
    let rc = unsafe {
        libc::getaddrinfo(
            host_c.as_ref().map_or(ptr::null(), |c| c.as_ptr()),
            port_c.as_ptr(),
            &hints,
            &mut res,
        )
    };
    if rc != 0 {
        return Err(RingError::Setup("getaddrinfo", rc));
    }

    let first = unsafe { &*res };
    let resolved = unsafe {
        match first.ai_family {
            libc::AF_INET => {
                let sa = *(first.ai_addr as *const libc::sockaddr_in);
                ResolvedAddr::V4(sa)
            }
            libc::AF_INET6 => {
                let sa = *(first.ai_addr as *const libc::sockaddr_in6);
                ResolvedAddr::V6(sa)
            }
            _ => {
                libc::freeaddrinfo(res);
                return Err(RingError::Setup("getaddrinfo", libc::EAFNOSUPPORT));
            }
        }
    };
    unsafe { libc::freeaddrinfo(res) };
    Ok(resolved)
}

pub fn io_error_from(result: i32) -> io::Error {
    io::Error::from_raw_os_error(-result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_from_negates_the_completion_result() {
        let err = io_error_from(-libc::ENOENT);
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }

    #[test]
    fn default_listen_backlog_matches_the_shared_constant() {
        assert_eq!(default_listen_backlog(), SOCKET_LISTEN_QUEUE_SIZE as i32);
    }

    #[test]
    fn bind_listener_accepts_an_ephemeral_loopback_port() {
        let fd = bind_listener("127.0.0.1", 0).expect("bind on an ephemeral port should succeed");
        assert!(fd >= 0);
        unsafe { libc::close(fd) };
    }

    #[test]
    fn raw_flags_reports_more_and_buffer_bits_independently() {
        assert_eq!(ringcore::submission::CQE_F_MORE & ringcore::submission::CQE_F_BUFFER, 0);
    }
}
