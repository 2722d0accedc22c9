//! Zero-dependency structured error type: a plain enum with a manual
//! `Display` impl rather than `thiserror`/`anyhow`.

use std::fmt;

#[derive(Debug)]
pub enum RingError {
    /// `io_uring_setup` (or the buffer-ring registration that follows it) failed.
    RingSetup(i32),
    /// Submission queue was full when a builder tried to push an entry.
    RingFull,
    /// `io_uring_enter` (submit/submit_and_wait) returned an error.
    Submit(i32),
    /// A setup syscall outside the ring failed: socket/bind/listen/setsockopt/getaddrinfo.
    Setup(&'static str, i32),
    /// A raw OS error surfaced from a completion or a direct syscall.
    Os(i32),
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RingSetup(e) => write!(f, "io_uring setup failed: errno {e}"),
            Self::RingFull => write!(f, "submission queue full"),
            Self::Submit(e) => write!(f, "io_uring submit failed: errno {e}"),
            Self::Setup(call, e) => write!(f, "{call} failed: errno {e}"),
            Self::Os(e) => write!(f, "OS error: errno {e}"),
        }
    }
}

impl std::error::Error for RingError {}

pub type Result<T> = std::result::Result<T, RingError>;

/// Wrap the current `errno` as a `RingError::Setup` for a named syscall.
pub fn setup_errno(call: &'static str) -> RingError {
    RingError::Setup(call, std::io::Error::last_os_error().raw_os_error().unwrap_or(-1))
}
