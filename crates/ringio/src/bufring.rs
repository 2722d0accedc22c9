//! Provided-buffer-ring registration, expressed through the `io-uring`
//! crate's [`io_uring::types::BufRingEntry`] instead of raw `liburing` calls.

use std::alloc::{alloc_zeroed, dealloc, Layout};

use io_uring::types::BufRingEntry;

use ringcore::error::{Result, RingError};

/// Page-aligned region of [`BufRingEntry`] slots, registered with the kernel
/// under one buffer group. Owns the raw allocation; `Drop` frees it.
pub struct BufRing {
    entries: *mut BufRingEntry,
    layout: Layout,
    ring_entries: u16,
    bgid: u16,
    local_tail: u16,
}

// Safety: a BufRing is only ever touched from the worker thread that created
// it (installed behind `ringio`'s thread-local), never shared across threads.
unsafe impl Send for BufRing {}

impl BufRing {
    /// Allocate a page-aligned region for `ring_entries` buffer slots.
    pub fn allocate(ring_entries: u16, bgid: u16) -> Result<Self> {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let size = ring_entries as usize * std::mem::size_of::<BufRingEntry>();
        let layout = Layout::from_size_align(size, page_size.max(1))
            .map_err(|_| RingError::RingSetup(libc::EINVAL))?;
        let ptr = unsafe { alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err(RingError::RingSetup(libc::ENOMEM));
        }
        Ok(Self {
            entries: ptr as *mut BufRingEntry,
            layout,
            ring_entries,
            bgid,
            local_tail: 0,
        })
    }

    pub fn bgid(&self) -> u16 {
        self.bgid
    }

    pub fn ring_addr(&self) -> u64 {
        self.entries as u64
    }

    pub fn ring_entries(&self) -> u16 {
        self.ring_entries
    }

    /// Publish one buffer (`addr`, `len`) under `buf_id` at the ring's
    /// current tail, then advance the tail. Used both for the initial
    /// publish-all-N-buffers pass and for a later single-buffer re-publish.
    ///
    /// # Safety
    /// `addr`/`len` must describe memory that outlives the buffer's time in
    /// the kernel's hands (i.e. until a completion reports this `buf_id`).
    pub unsafe fn add_buffer(&mut self, addr: u64, len: u32, buf_id: u16) {
        let mask = self.ring_entries - 1;
        let slot_idx = (self.local_tail & mask) as usize;
        let slot = &mut *self.entries.add(slot_idx);
        slot.set_addr(addr);
        slot.set_len(len);
        slot.set_bid(buf_id);
        self.local_tail = self.local_tail.wrapping_add(1);

        // The ring's tail lives in entry 0's overlapping `tail` field
        // (liburing's `io_uring_buf_ring` union) and must be published with
        // a release so the kernel observes the new entries before the tail.
        let head_slot = &mut *self.entries;
        head_slot.set_tail(self.local_tail);
    }
}

impl Drop for BufRing {
    fn drop(&mut self) {
        unsafe { dealloc(self.entries as *mut u8, self.layout) };
    }
}
