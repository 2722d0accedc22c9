//! One-shot ring-backed I/O futures and the file-descriptor helpers they sit
//! on top of.

use std::ffi::CString;
use std::future::Future;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use ringcore::submission::SubmissionContext;
use ringio::io_error_from;

/// Bytes received plus the provided-buffer id they live in, so the caller
/// can copy them out of the pool and release the buffer back to the kernel.
pub struct RecvOutcome {
    pub buf_id: u16,
    pub len: usize,
}

struct RecvOnce {
    fd: i32,
    bgid: u16,
    ctx: SubmissionContext,
    submitted: bool,
}

impl Future for RecvOnce {
    type Output = io::Result<Option<RecvOutcome>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        this.ctx.waker = Some(cx.waker().clone());
        if !this.submitted {
            this.submitted = true;
            let ctx_ptr: *mut SubmissionContext = &mut this.ctx;
            if let Err(e) = ringio::with_ring(|ring| ring.push_recv_buf_select(this.fd, this.bgid, unsafe { &mut *ctx_ptr })) {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, e)));
            }
            return Poll::Pending;
        }

        let record = match this.ctx.pop_completion() {
            Some(record) => record,
            None => return Poll::Pending,
        };

        if record.result < 0 {
            return Poll::Ready(Err(io_error_from(record.result)));
        }
        if record.result == 0 {
            return Poll::Ready(Ok(None));
        }
        if !record.has_buffer() {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "recv completed with no buffer selected")));
        }
        Poll::Ready(Ok(Some(RecvOutcome { buf_id: record.buffer_id(), len: record.result as usize })))
    }
}

/// Receive once into a provided buffer.
pub async fn recv_once(fd: i32, bgid: u16) -> io::Result<Option<RecvOutcome>> {
    RecvOnce { fd, bgid, ctx: SubmissionContext::new(), submitted: false }.await
}

struct SendOnce<'a> {
    fd: i32,
    buf: &'a [u8],
    ctx: SubmissionContext,
    submitted: bool,
}

impl Future for SendOnce<'_> {
    type Output = io::Result<usize>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        this.ctx.waker = Some(cx.waker().clone());
        if !this.submitted {
            this.submitted = true;
            let ctx_ptr: *mut SubmissionContext = &mut this.ctx;
            let buf = this.buf;
            if let Err(e) = ringio::with_ring(|ring| ring.push_send(this.fd, buf, unsafe { &mut *ctx_ptr })) {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, e)));
            }
            return Poll::Pending;
        }
        let record = match this.ctx.pop_completion() {
            Some(record) => record,
            None => return Poll::Pending,
        };
        if record.result < 0 {
            return Poll::Ready(Err(io_error_from(record.result)));
        }
        Poll::Ready(Ok(record.result as usize))
    }
}

/// Send the full buffer, looping over short writes.
pub async fn send_all(fd: i32, buf: &[u8]) -> io::Result<usize> {
    let mut sent = 0usize;
    while sent < buf.len() {
        let n = SendOnce { fd, buf: &buf[sent..], ctx: SubmissionContext::new(), submitted: false }.await?;
        if n == 0 {
            break;
        }
        sent += n;
    }
    Ok(sent)
}

struct SpliceOnce {
    fd_in: i32,
    fd_out: i32,
    len: u32,
    ctx: SubmissionContext,
    submitted: bool,
}

impl Future for SpliceOnce {
    type Output = io::Result<usize>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        this.ctx.waker = Some(cx.waker().clone());
        if !this.submitted {
            this.submitted = true;
            let ctx_ptr: *mut SubmissionContext = &mut this.ctx;
            let (fd_in, fd_out, len) = (this.fd_in, this.fd_out, this.len);
            if let Err(e) = ringio::with_ring(|ring| ring.push_splice(fd_in, -1, fd_out, -1, len, unsafe { &mut *ctx_ptr })) {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, e)));
            }
            return Poll::Pending;
        }
        let record = match this.ctx.pop_completion() {
            Some(record) => record,
            None => return Poll::Pending,
        };
        if record.result < 0 {
            return Poll::Ready(Err(io_error_from(record.result)));
        }
        Poll::Ready(Ok(record.result as usize))
    }
}

const SPLICE_CHUNK: u32 = 1 << 20;

/// Zero-copy transfer of `len` bytes from `fd_in` to `fd_out` via an
/// intermediate pipe — `splice(2)` requires one endpoint to be a pipe, so
/// this bridges `fd_in -> pipe write end` then `pipe read end -> fd_out`
/// per chunk.
pub async fn splice_all(fd_in: i32, fd_out: i32, len: u64) -> io::Result<u64> {
    let (pipe_read, pipe_write) = make_pipe()?;
    let mut remaining = len;
    let result = async {
        while remaining > 0 {
            let chunk = remaining.min(SPLICE_CHUNK as u64) as u32;
            let to_pipe = SpliceOnce {
                fd_in,
                fd_out: pipe_write,
                len: chunk,
                ctx: SubmissionContext::new(),
                submitted: false,
            }
            .await?;
            if to_pipe == 0 {
                break;
            }
            let mut moved = 0usize;
            while moved < to_pipe {
                let from_pipe = SpliceOnce {
                    fd_in: pipe_read,
                    fd_out,
                    len: (to_pipe - moved) as u32,
                    ctx: SubmissionContext::new(),
                    submitted: false,
                }
                .await?;
                if from_pipe == 0 {
                    break;
                }
                moved += from_pipe;
            }
            remaining -= to_pipe as u64;
        }
        Ok(len - remaining)
    }
    .await;
    unsafe {
        libc::close(pipe_read);
        libc::close(pipe_write);
    }
    result
}

fn make_pipe() -> io::Result<(i32, i32)> {
    let mut fds = [0i32; 2];
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok((fds[0], fds[1]))
}

/// `open()` a regular file read-only — `file_descriptor open(const path&)`.
pub fn open_file(path: &Path) -> io::Result<i32> {
    let c_path = CString::new(path.as_os_str().to_string_lossy().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains a nul byte"))?;
    let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_RDONLY | libc::O_CLOEXEC) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(fd)
}

pub fn close_fd(fd: i32) {
    unsafe {
        libc::close(fd);
    }
}
