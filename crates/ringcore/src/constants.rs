//! Tunable constants for ring sizing, buffer sizing, and listen backlog.

/// Backlog passed to `listen(2)` on the shared listening socket.
pub const SOCKET_LISTEN_QUEUE_SIZE: u32 = 512;

/// Upper bound on buffer ids a `ringpool::BufferPool` can track in its
/// borrowed-bitmap, independent of how many buffers are actually registered.
pub const MAX_BUFFER_RING_SIZE: usize = 65536;

/// Number of submission/completion queue entries per worker's ring.
pub const IO_URING_QUEUE_SIZE: u32 = 2048;

/// The one buffer group every worker's pool registers under.
pub const BUFFER_GROUP_ID: u16 = 0;

/// Number of buffers registered in the provided-buffer ring.
pub const BUFFER_RING_SIZE: u16 = 4096;

/// Size in bytes of each provided buffer.
pub const BUFFER_SIZE: usize = 1024;
