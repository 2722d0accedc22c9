//! Process-wide shutdown flag, flipped by a `SIGINT`/`SIGTERM` handler and
//! polled by every worker's event loop at the top of each iteration.

use std::sync::atomic::{AtomicBool, Ordering};

static RUNNING: AtomicBool = AtomicBool::new(true);

pub fn request_shutdown() {
    RUNNING.store(false, Ordering::Relaxed);
}

pub fn is_running() -> bool {
    RUNNING.load(Ordering::Relaxed)
}
