//! `ringpool` — the data storage behind a worker's provided-buffer ring.
//!
//! Owns a flat array of fixed-size buffers plus a bitmap of which ids are
//! currently lent out to the kernel or to application code. The kernel-facing
//! half of buffer management (registering the ring, re-publishing a buffer
//! id) belongs to [`ringio::Ring`]; `BufferPool` owns the bytes and the
//! bitmap and drives `ringio::with_ring` for the registration calls.

use std::cell::RefCell;

use ringcore::constants::{BUFFER_GROUP_ID, BUFFER_RING_SIZE, BUFFER_SIZE, MAX_BUFFER_RING_SIZE};
use ringcore::error::Result;

/// Fixed-size backing storage for one worker's provided buffers, plus the
/// borrowed/free bitmap tracking which ids the application currently holds.
///
/// Not `Sync` — one pool per worker thread, touched only from that thread's
/// event loop and its completion handlers.
pub struct BufferPool {
    storage: RefCell<Vec<u8>>,
    buf_len: usize,
    count: usize,
    bgid: u16,
    borrowed: RefCell<Vec<bool>>,
}

impl BufferPool {
    /// Allocate `count` buffers of `buf_len` bytes each, register them with
    /// the current thread's ring under `bgid`, and return the pool.
    ///
    /// # Panics
    /// Panics if [`ringio::install`] was not already called on this thread.
    pub fn register(bgid: u16, count: u16, buf_len: usize) -> Result<Self> {
        assert!(count as usize <= MAX_BUFFER_RING_SIZE, "buffer ring size exceeds the tracked bitmap capacity");
        let mut storage = vec![0u8; count as usize * buf_len];
        let base = storage.as_mut_ptr() as u64;

        let descriptors: Vec<(u64, u32)> = (0..count as usize)
            .map(|i| (base + (i * buf_len) as u64, buf_len as u32))
            .collect();

        ringio::with_ring(|ring| unsafe { ring.register_buffer_ring(bgid, count, &descriptors) })?;

        Ok(Self {
            storage: RefCell::new(storage),
            buf_len,
            count: count as usize,
            bgid,
            borrowed: RefCell::new(vec![false; count as usize]),
        })
    }

    /// Register the default pool sized from [`ringcore::constants`], the
    /// configuration every worker uses unless overridden.
    pub fn register_default() -> Result<Self> {
        Self::register(BUFFER_GROUP_ID, BUFFER_RING_SIZE, BUFFER_SIZE)
    }

    pub fn bgid(&self) -> u16 {
        self.bgid
    }

    /// Borrow the bytes a completion reported under `buf_id`, up to `len`
    /// (the completion's `result`, i.e. bytes actually received), and hand
    /// them to `f` without copying. The borrow ends when `f` returns, so the
    /// caller is free to call [`Self::release`] right after `take`.
    ///
    /// # Panics
    /// Panics if `buf_id` is out of range or `len` exceeds `buf_len`.
    pub fn take<R>(&self, buf_id: u16, len: usize, f: impl FnOnce(&[u8]) -> R) -> R {
        let idx = buf_id as usize;
        assert!(idx < self.count, "buf_id {buf_id} out of range for pool of {}", self.count);
        assert!(len <= self.buf_len, "completion length {len} exceeds buffer size {}", self.buf_len);
        self.borrowed.borrow_mut()[idx] = true;
        let storage = self.storage.borrow();
        let start = idx * self.buf_len;
        f(&storage[start..start + len])
    }

    /// Re-publish `buf_id` back to the kernel once its bytes have been
    /// copied out by [`Self::take`], so the kernel can select it again on a
    /// future recv.
    pub fn release(&self, buf_id: u16) {
        let idx = buf_id as usize;
        assert!(idx < self.count, "buf_id {buf_id} out of range for pool of {}", self.count);
        self.borrowed.borrow_mut()[idx] = false;
        let addr = {
            let storage = self.storage.borrow();
            storage.as_ptr() as u64 + (idx * self.buf_len) as u64
        };
        ringio::with_ring(|ring| unsafe { ring.add_buffer(addr, self.buf_len as u32, buf_id) });
    }

    pub fn buffer_len(&self) -> usize {
        self.buf_len
    }

    pub fn count(&self) -> usize {
        self.count
    }

    #[cfg(test)]
    pub fn is_borrowed(&self, buf_id: u16) -> bool {
        self.borrowed.borrow()[buf_id as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // `BufferPool::register` requires an installed `ringio::Ring` (it calls
    // `ringio::with_ring` to register the buffer group with the kernel), so
    // these tests build a pool by hand instead of through `register`, to
    // exercise `take`/`release`/bitmap bookkeeping without a real ring.
    fn bare_pool(count: usize, buf_len: usize) -> BufferPool {
        BufferPool {
            storage: RefCell::new(vec![0u8; count * buf_len]),
            buf_len,
            count,
            bgid: 0,
            borrowed: RefCell::new(vec![false; count]),
        }
    }

    #[test]
    fn bitmap_starts_empty() {
        let pool = bare_pool(4, 16);
        for id in 0..4 {
            assert!(!pool.is_borrowed(id));
        }
    }

    #[test]
    fn take_marks_the_buffer_borrowed_and_views_the_requested_length() {
        let pool = bare_pool(2, 16);
        pool.storage.borrow_mut()[0..5].copy_from_slice(b"hello");
        let seen = pool.take(0, 5, |bytes| bytes.to_vec());
        assert_eq!(seen, b"hello");
        assert!(pool.is_borrowed(0));
        assert!(!pool.is_borrowed(1));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn take_panics_on_an_out_of_range_buffer_id() {
        let pool = bare_pool(2, 16);
        pool.take(5, 1, |_| ());
    }

    #[test]
    #[should_panic(expected = "exceeds buffer size")]
    fn take_panics_when_length_exceeds_the_buffer_size() {
        let pool = bare_pool(2, 16);
        pool.take(0, 32, |_| ());
    }
}
