//! A single-threaded task executor. One `LocalExecutor` lives per worker OS
//! thread and drives every connection handler spawned on it; it never
//! crosses a thread boundary, which is what lets its waker skip atomics
//! entirely.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

type BoxedFuture = Pin<Box<dyn Future<Output = ()>>>;

struct Slot {
    future: Option<BoxedFuture>,
}

/// Cooperative, non-preemptive executor for one OS thread's connection
/// handlers. Each handler is an `async fn`, spawned with [`spawn`] and
/// driven to completion by repeated calls to [`turn`].
#[derive(Default)]
pub struct LocalExecutor {
    slots: RefCell<Vec<Slot>>,
    free: RefCell<Vec<usize>>,
    ready: Rc<RefCell<VecDeque<usize>>>,
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a future to run to completion on this executor. Detached: no
    /// handle is returned, every spawned task is fire-and-forget.
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        let boxed: BoxedFuture = Box::pin(future);
        let mut slots = self.slots.borrow_mut();
        let id = if let Some(id) = self.free.borrow_mut().pop() {
            slots[id] = Slot { future: Some(boxed) };
            id
        } else {
            slots.push(Slot { future: Some(boxed) });
            slots.len() - 1
        };
        drop(slots);
        self.ready.borrow_mut().push_back(id);
    }

    /// True once every spawned task has run to completion.
    pub fn is_idle(&self) -> bool {
        self.free.borrow().len() == self.slots.borrow().len()
    }

    /// Poll every task currently in the ready queue exactly once. Returns the
    /// number of tasks polled, so callers can decide whether to keep turning
    /// before blocking on `io_uring_enter` again.
    pub fn turn(&self) -> usize {
        let batch: Vec<usize> = {
            let mut ready = self.ready.borrow_mut();
            ready.drain(..).collect()
        };
        let polled = batch.len();
        for id in batch {
            self.poll_task(id);
        }
        polled
    }

    fn poll_task(&self, id: usize) {
        let mut future = match self.slots.borrow_mut()[id].future.take() {
            Some(f) => f,
            None => return,
        };
        let waker = make_waker(id, Rc::clone(&self.ready));
        let mut cx = Context::from_waker(&waker);
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                self.free.borrow_mut().push(id);
            }
            Poll::Pending => {
                self.slots.borrow_mut()[id].future = Some(future);
            }
        }
    }
}

struct WakeSource {
    id: usize,
    ready: Rc<RefCell<VecDeque<usize>>>,
}

// Safety: every `Waker` built by `make_waker` is only ever cloned or woken
// from the same OS thread that owns the `LocalExecutor` it points into — a
// `Ring` completion handler runs on the thread it was submitted from, and
// this executor is never installed on more than one thread. The Send/Sync
// impls exist only so `std::task::Waker`'s own (unconditional) bounds are
// satisfiable; nothing actually crosses a thread.
unsafe impl Send for WakeSource {}
unsafe impl Sync for WakeSource {}

fn make_waker(id: usize, ready: Rc<RefCell<VecDeque<usize>>>) -> Waker {
    let source = Rc::new(WakeSource { id, ready });
    let raw = Rc::into_raw(source) as *const ();
    unsafe { Waker::from_raw(RawWaker::new(raw, &VTABLE)) }
}

static VTABLE: RawWakerVTable = RawWakerVTable::new(clone_raw, wake_raw, wake_by_ref_raw, drop_raw);

unsafe fn clone_raw(ptr: *const ()) -> RawWaker {
    let source = ptr as *const WakeSource;
    Rc::increment_strong_count(source);
    RawWaker::new(ptr, &VTABLE)
}

unsafe fn wake_raw(ptr: *const ()) {
    wake_by_ref_raw(ptr);
    drop_raw(ptr);
}

unsafe fn wake_by_ref_raw(ptr: *const ()) {
    let source = &*(ptr as *const WakeSource);
    source.ready.borrow_mut().push_back(source.id);
}

unsafe fn drop_raw(ptr: *const ()) {
    drop(Rc::from_raw(ptr as *const WakeSource));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc as StdRc;

    #[test]
    fn runs_ready_future_to_completion() {
        let executor = LocalExecutor::new();
        let ran = StdRc::new(Cell::new(false));
        let ran_clone = StdRc::clone(&ran);
        executor.spawn(async move {
            ran_clone.set(true);
        });
        assert!(!executor.is_idle());
        executor.turn();
        assert!(ran.get());
        assert!(executor.is_idle());
    }

    #[test]
    fn pending_future_is_requeued_on_wake() {
        struct WakeImmediately(bool);
        impl Future for WakeImmediately {
            type Output = ();
            fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
                if self.0 {
                    Poll::Ready(())
                } else {
                    self.0 = true;
                    cx.waker().wake_by_ref();
                    Poll::Pending
                }
            }
        }

        let executor = LocalExecutor::new();
        executor.spawn(WakeImmediately(false));
        executor.turn();
        assert!(!executor.is_idle());
        executor.turn();
        assert!(executor.is_idle());
    }
}
