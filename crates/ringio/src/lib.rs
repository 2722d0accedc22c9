//! `ringio` — the ring facade.
//!
//! A thin wrapper over the `io-uring` crate. `Ring` itself never touches
//! threads or tasks — it only knows how to push SQEs and drain CQEs. A
//! per-thread singleton lifecycle (one ring per worker OS thread, installed
//! once at worker start, looked up by every awaiter) keeps the ring out of
//! function signatures that would otherwise have to thread `&mut Ring`
//! across every `.await` point.

mod bufring;
mod ring;

pub use bufring::BufRing;
pub use ring::{bind_listener, io_error_from, Completion, Ring};

use std::cell::RefCell;

thread_local! {
    static RING: RefCell<Option<Ring>> = const { RefCell::new(None) };
}

/// Install this thread's ring. Called once per worker thread during setup.
pub fn install(ring: Ring) {
    RING.with(|slot| *slot.borrow_mut() = Some(ring));
}

/// Borrow the current thread's ring for the duration of `f`. Every awaiter
/// in `ringserver` calls this instead of holding a `&mut Ring` across an
/// `.await` point, which would otherwise conflict with the event loop's own
/// access to the same ring.
///
/// # Panics
/// Panics if [`install`] was never called on this thread.
pub fn with_ring<R>(f: impl FnOnce(&mut Ring) -> R) -> R {
    RING.with(|slot| {
        let mut guard = slot.borrow_mut();
        let ring = guard.as_mut().expect("ringio::with_ring: no ring installed on this thread");
        f(ring)
    })
}
